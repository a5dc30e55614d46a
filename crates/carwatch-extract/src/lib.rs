//! Field extraction for carwatch: declarative rules evaluated against a
//! parsed HTML document, the fetch capability the crawler consumes, and the
//! per-site profiles that turn pages into records.

pub mod document;
pub mod error;
pub mod fetch;
pub mod kavak;
pub mod registry;
pub mod rule;
pub mod site;

pub use document::Document;
pub use error::{Error, Result};
pub use registry::{Extracted, FieldRules};
pub use rule::{Cardinality, Rule, Scope, evaluate};
