//! Extraction rules and their evaluation.
//!
//! A [`Rule`] is validated when it is built: selectors and patterns are
//! compiled, cardinalities parsed and capture groups checked, so a rule
//! that exists can always be evaluated. Evaluation itself never fails; a
//! rule that matches nothing yields `None`.

use std::{fmt, str::FromStr};

use regex::Regex;
use scraper::Selector;

use crate::{
  Error, Result,
  document::{Document, neighbor_text, text_of},
};

// ─── Cardinality ─────────────────────────────────────────────────────────────

/// Which of several matches a rule keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
  #[default]
  First,
  Last,
  All,
}

impl FromStr for Cardinality {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "first" => Ok(Self::First),
      "last" => Ok(Self::Last),
      "all" => Ok(Self::All),
      other => Err(Error::malformed(
        other,
        "cardinality must be one of \"first\", \"last\", \"all\"",
      )),
    }
  }
}

impl fmt::Display for Cardinality {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::First => "first",
      Self::Last => "last",
      Self::All => "all",
    })
  }
}

impl Cardinality {
  fn pick(self, mut items: Vec<String>, separator: &str) -> Option<String> {
    match self {
      Self::First => items.into_iter().next(),
      Self::Last => items.pop(),
      Self::All if items.is_empty() => None,
      Self::All => Some(items.join(separator)),
    }
  }
}

// ─── Scope ───────────────────────────────────────────────────────────────────

/// The region a pattern is applied to.
#[derive(Debug, Clone)]
pub enum Scope {
  Document,
  /// The first element matching the selector.
  Selector(Selector),
}

impl Scope {
  pub fn selector(css: &str) -> Result<Self> { Ok(Self::Selector(parse_selector(css)?)) }

  fn text(&self, doc: &Document) -> Option<String> {
    match self {
      Self::Document => Some(text_of(doc.root())),
      Self::Selector(sel) => doc.select(sel).next().map(text_of),
    }
  }
}

// ─── Rule ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Rule {
  /// Text of the nodes matching `selector`.
  CssText {
    selector:    Selector,
    cardinality: Cardinality,
    separator:   String,
  },
  /// Value of `attribute` on the nodes matching `selector`.
  CssAttr {
    selector:    Selector,
    attribute:   String,
    cardinality: Cardinality,
    separator:   String,
  },
  /// Text next to the first `tag` element whose text matches `label`.
  SiblingText { label: Regex, tag: Selector },
  /// Capture `group` of `pattern` over the text of `scope`.
  RegexOverScope {
    pattern:      Regex,
    scope:        Scope,
    group:        usize,
    multiplicity: Cardinality,
    separator:    String,
  },
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector> {
  Selector::parse(css).map_err(|e| Error::malformed(css, e))
}

pub(crate) fn parse_regex(pattern: &str) -> Result<Regex> {
  Regex::new(pattern).map_err(|e| Error::malformed(pattern, e))
}

impl Rule {
  pub fn css_text(selector: &str, cardinality: &str) -> Result<Self> {
    Ok(Self::CssText {
      selector:    parse_selector(selector)?,
      cardinality: cardinality.parse()?,
      separator:   String::new(),
    })
  }

  pub fn css_attr(selector: &str, attribute: &str, cardinality: &str) -> Result<Self> {
    Ok(Self::CssAttr {
      selector:    parse_selector(selector)?,
      attribute:   attribute.to_owned(),
      cardinality: cardinality.parse()?,
      separator:   String::new(),
    })
  }

  /// Sibling of a `<p>` label.
  pub fn sibling_text(label: &str) -> Result<Self> { Self::sibling_text_in(label, "p") }

  pub fn sibling_text_in(label: &str, tag: &str) -> Result<Self> {
    Ok(Self::SiblingText { label: parse_regex(label)?, tag: parse_selector(tag)? })
  }

  /// First match of capture group 1 over the whole document.
  pub fn regex(pattern: &str) -> Result<Self> {
    Self::regex_over_scope(pattern, Scope::Document, 1, "first")
  }

  /// First match of capture group 1 within the first `scope` element.
  pub fn regex_within(pattern: &str, scope: &str) -> Result<Self> {
    Self::regex_over_scope(pattern, Scope::selector(scope)?, 1, "first")
  }

  pub fn regex_over_scope(
    pattern: &str,
    scope: Scope,
    group: usize,
    multiplicity: &str,
  ) -> Result<Self> {
    let compiled = parse_regex(pattern)?;
    if group >= compiled.captures_len() {
      return Err(Error::malformed(
        pattern,
        format!("pattern has no capture group {group}"),
      ));
    }
    Ok(Self::RegexOverScope {
      pattern: compiled,
      scope,
      group,
      multiplicity: multiplicity.parse()?,
      separator: String::new(),
    })
  }

  /// Separator used when the cardinality is `All`. Defaults to empty.
  pub fn separated_by(mut self, sep: &str) -> Self {
    match &mut self {
      Self::CssText { separator, .. }
      | Self::CssAttr { separator, .. }
      | Self::RegexOverScope { separator, .. } => *separator = sep.to_owned(),
      Self::SiblingText { .. } => {}
    }
    self
  }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Evaluate `rule` against `doc`. Whitespace around each matched value is
/// trimmed and a blank result counts as absent.
pub fn evaluate(rule: &Rule, doc: &Document) -> Option<String> {
  let raw = match rule {
    Rule::CssText { selector, cardinality, separator } => {
      let texts = doc
        .select(selector)
        .map(|el| text_of(el).trim().to_owned())
        .collect();
      cardinality.pick(texts, separator)
    }
    Rule::CssAttr { selector, attribute, cardinality, separator } => {
      let values = doc
        .select(selector)
        .filter_map(|el| el.value().attr(attribute))
        .map(|v| v.trim().to_owned())
        .collect();
      cardinality.pick(values, separator)
    }
    Rule::SiblingText { label, tag } => {
      doc.find_by_text(tag, label).and_then(neighbor_text)
    }
    Rule::RegexOverScope { pattern, scope, group, multiplicity, separator } => {
      let text = scope.text(doc)?;
      let found = pattern
        .captures_iter(&text)
        .filter_map(|c| c.get(*group))
        .map(|m| m.as_str().trim().to_owned())
        .collect();
      multiplicity.pick(found, separator)
    }
  };
  raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  const LIST: &str = "<ul><li class='x'>A</li><li class='x'> B </li><li class='x'>C</li></ul>";

  #[test]
  fn css_text_all_joins_with_separator() {
    let doc = Document::parse(LIST);
    let rule = Rule::css_text("li.x", "all").unwrap().separated_by("\n");
    assert_eq!(evaluate(&rule, &doc).as_deref(), Some("A\nB\nC"));
  }

  #[test]
  fn css_text_without_matches_is_absent() {
    let doc = Document::parse(LIST);
    let rule = Rule::css_text("li.missing", "all").unwrap().separated_by("\n");
    assert_eq!(evaluate(&rule, &doc), None);
  }

  #[test]
  fn css_text_first_and_last() {
    let doc = Document::parse(LIST);
    let first = Rule::css_text("li.x", "first").unwrap();
    let last = Rule::css_text("li.x", "last").unwrap();
    assert_eq!(evaluate(&first, &doc).as_deref(), Some("A"));
    assert_eq!(evaluate(&last, &doc).as_deref(), Some("C"));
  }

  #[test]
  fn unsupported_cardinality_is_malformed() {
    let err = Rule::css_text("li", "some").unwrap_err();
    assert!(matches!(err, Error::MalformedRule { .. }));
  }

  #[test]
  fn bad_selector_is_malformed() {
    assert!(matches!(
      Rule::css_text("li[", "first"),
      Err(Error::MalformedRule { .. })
    ));
  }

  #[test]
  fn missing_capture_group_is_malformed() {
    let err = Rule::regex_over_scope(r"\d+ km", Scope::Document, 1, "first").unwrap_err();
    assert!(matches!(err, Error::MalformedRule { .. }));
  }

  #[test]
  fn css_attr_reads_attribute() {
    let doc = Document::parse("<div class='s'><img src=' /a.jpg '></div><div class='s'><img></div>");
    let rule = Rule::css_attr("div.s img", "src", "first").unwrap();
    assert_eq!(evaluate(&rule, &doc).as_deref(), Some("/a.jpg"));
  }

  #[test]
  fn sibling_text_finds_labelled_value() {
    let doc = Document::parse("<section><p>Tipo de Carrocería</p><p>suv</p></section>");
    let rule = Rule::sibling_text("Tipo de Carrocer.a").unwrap();
    assert_eq!(evaluate(&rule, &doc).as_deref(), Some("suv"));
  }

  #[test]
  fn sibling_text_without_label_is_absent() {
    let doc = Document::parse("<p>nothing here</p>");
    let rule = Rule::sibling_text("Stock ID").unwrap();
    assert_eq!(evaluate(&rule, &doc), None);
  }

  #[test]
  fn regex_within_scope_only() {
    let doc = Document::parse(
      "<div id='sheet'><span>3.5</span> Litros</div><div id='other'>2.0 Litros</div>",
    );
    let rule = Rule::regex_within(r"(\d+(?:\.\d+)?)\s?Litros", "#other").unwrap();
    assert_eq!(evaluate(&rule, &doc).as_deref(), Some("2.0"));
  }

  #[test]
  fn regex_all_joins_every_match() {
    let doc = Document::parse("<p>1 km</p><p>22 km</p>");
    let rule = Rule::regex_over_scope(r"(\d+) km", Scope::Document, 1, "all")
      .unwrap()
      .separated_by(",");
    assert_eq!(evaluate(&rule, &doc).as_deref(), Some("1,22"));
  }

  #[test]
  fn regex_scope_missing_is_absent() {
    let doc = Document::parse("<p>1 km</p>");
    let rule = Rule::regex_within(r"(\d+) km", "#nowhere").unwrap();
    assert_eq!(evaluate(&rule, &doc), None);
  }
}
