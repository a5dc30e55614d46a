//! Binding field names to rules.

use std::collections::BTreeMap;

use carwatch_core::normalize;

use crate::{Document, Rule, evaluate};

/// A set of named rules evaluated together against one document.
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
  rules: BTreeMap<&'static str, Rule>,
}

impl FieldRules {
  pub fn new() -> Self { Self::default() }

  /// Bind `name` to `rule`, replacing any earlier binding.
  pub fn field(mut self, name: &'static str, rule: Rule) -> Self {
    self.rules.insert(name, rule);
    self
  }

  pub fn get(&self, name: &str) -> Option<&Rule> { self.rules.get(name) }

  pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.rules.keys().copied()
  }

  pub fn extract(&self, doc: &Document) -> Extracted {
    let values = self
      .rules
      .iter()
      .filter_map(|(name, rule)| evaluate(rule, doc).map(|v| (*name, v)))
      .collect();
    Extracted { values }
  }
}

/// The values a [`FieldRules`] produced. Fields whose rule matched nothing
/// are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
  values: BTreeMap<&'static str, String>,
}

impl Extracted {
  pub fn text(&self, name: &str) -> Option<&str> { self.values.get(name).map(String::as_str) }

  pub fn int(&self, name: &str) -> Option<i64> { self.text(name).and_then(normalize::int) }

  pub fn float(&self, name: &str) -> Option<f64> { self.text(name).and_then(normalize::float) }

  /// Localized yes/no; absent reads as `false`.
  pub fn flag(&self, name: &str) -> bool { normalize::flag(self.text(name)) }

  pub fn len(&self) -> usize { self.values.len() }

  pub fn is_empty(&self) -> bool { self.values.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unmatched_fields_are_absent() {
    let rules = FieldRules::new()
      .field("price", Rule::css_text("span.price", "first").unwrap())
      .field("city", Rule::css_text("span.city", "first").unwrap());
    let doc = Document::parse("<span class='price'>$ 1,250,000</span>");
    let out = rules.extract(&doc);

    assert_eq!(out.len(), 1);
    assert_eq!(out.int("price"), Some(1_250_000));
    assert_eq!(out.text("city"), None);
    assert!(!out.flag("city"));
  }

  #[test]
  fn unparsable_numbers_are_absent() {
    let rules = FieldRules::new().field("year", Rule::css_text("b", "first").unwrap());
    let out = rules.extract(&Document::parse("<b>n/a</b>"));
    assert_eq!(out.text("year"), Some("n/a"));
    assert_eq!(out.int("year"), None);
  }
}
