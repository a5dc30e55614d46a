//! A parsed HTML page with the three navigation primitives rules need:
//! select by CSS selector, find by tag and text pattern, and step to a
//! structural neighbour.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector, html::Select};

pub struct Document {
  html: Html,
}

impl Document {
  pub fn parse(body: &str) -> Self { Self { html: Html::parse_document(body) } }

  pub fn select<'a, 'b>(&'a self, selector: &'b Selector) -> Select<'a, 'b> {
    self.html.select(selector)
  }

  pub fn root(&self) -> ElementRef<'_> { self.html.root_element() }

  /// The first `tag` element whose text matches `pattern`.
  pub fn find_by_text(&self, tag: &Selector, pattern: &Regex) -> Option<ElementRef<'_>> {
    self.select(tag).find(|el| pattern.is_match(&text_of(*el)))
  }
}

/// All descendant text, concatenated without separators.
pub fn text_of(el: ElementRef<'_>) -> String { el.text().collect() }

/// Text of the nearest sibling: an element, or a text node that is not
/// blank. Looks forward first, then backward.
pub fn neighbor_text(el: ElementRef<'_>) -> Option<String> {
  for node in el.next_siblings() {
    if let Some(text) = meaningful(node.value(), ElementRef::wrap(node)) {
      return Some(text);
    }
  }
  for node in el.prev_siblings() {
    if let Some(text) = meaningful(node.value(), ElementRef::wrap(node)) {
      return Some(text);
    }
  }
  None
}

fn meaningful(node: &Node, element: Option<ElementRef<'_>>) -> Option<String> {
  match node {
    Node::Element(_) => element.map(text_of),
    Node::Text(t) if !t.trim().is_empty() => Some(t.trim().to_owned()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sel(s: &str) -> Selector { Selector::parse(s).unwrap() }

  #[test]
  fn neighbour_prefers_next_sibling() {
    let doc = Document::parse("<div><p>before</p><p>Stock ID</p>\n  <p>12345</p></div>");
    let label = doc
      .find_by_text(&sel("p"), &Regex::new("Stock ID").unwrap())
      .unwrap();
    assert_eq!(neighbor_text(label).as_deref(), Some("12345"));
  }

  #[test]
  fn neighbour_falls_back_to_previous() {
    let doc = Document::parse("<div><p>Manual</p><p>Transmisión</p></div>");
    let label = doc
      .find_by_text(&sel("p"), &Regex::new("Transmisi.n").unwrap())
      .unwrap();
    assert_eq!(neighbor_text(label).as_deref(), Some("Manual"));
  }

  #[test]
  fn lone_element_has_no_neighbour() {
    let doc = Document::parse("<div><p>Stock ID</p></div>");
    let label = doc
      .find_by_text(&sel("p"), &Regex::new("Stock ID").unwrap())
      .unwrap();
    assert_eq!(neighbor_text(label), None);
  }

  #[test]
  fn text_of_concatenates_descendants() {
    let doc = Document::parse("<div id='x'><b>290</b>Caballos de Fuerza</div>");
    let div = doc.select(&sel("#x")).next().unwrap();
    assert_eq!(text_of(div), "290Caballos de Fuerza");
  }
}
