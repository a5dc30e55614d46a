//! Per-field normalization applied when records are built.
//!
//! Every function is total: input that cannot be interpreted becomes `None`.

/// Trimmed text with inner whitespace collapsed to single spaces.
pub fn clean(raw: &str) -> Option<String> {
  let joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
  (!joined.is_empty()).then_some(joined)
}

/// Proper-noun casing: each word, and each hyphenated part of a word, gets
/// an upper-case initial and lower-case tail.
pub fn proper_noun(raw: &str) -> Option<String> {
  let cleaned = clean(raw)?;
  let words: Vec<String> = cleaned
    .split(' ')
    .map(|word| {
      word
        .split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("-")
    })
    .collect();
  Some(words.join(" "))
}

fn capitalize(part: &str) -> String {
  let mut chars = part.chars();
  match chars.next() {
    Some(first) => first
      .to_uppercase()
      .chain(chars.flat_map(char::to_lowercase))
      .collect(),
    None => String::new(),
  }
}

/// Coded categorical values (body style codes and the like) are upper-cased.
pub fn coded(raw: &str) -> Option<String> {
  clean(raw).map(|s| s.to_uppercase())
}

/// Localized yes/no: "Sí" or "Si" in any case is `true`; any other present
/// value, and absence, is `false`.
pub fn flag(raw: Option<&str>) -> bool {
  raw
    .map(str::trim)
    .is_some_and(|s| s.eq_ignore_ascii_case("si") || s.to_lowercase() == "sí")
}

fn strip_number(raw: &str) -> String {
  raw
    .trim()
    .trim_start_matches('$')
    .chars()
    .filter(|c| *c != ',' && !c.is_whitespace())
    .collect()
}

/// Integer with thousands separators and a leading currency sign removed.
pub fn int(raw: &str) -> Option<i64> { strip_number(raw).parse().ok() }

/// Decimal with thousands separators removed.
pub fn float(raw: &str) -> Option<f64> {
  strip_number(raw).parse::<f64>().ok().filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn proper_noun_casing() {
    assert_eq!(proper_noun("FORD").as_deref(), Some("Ford"));
    assert_eq!(proper_noun("  mercedes-benz  ").as_deref(), Some("Mercedes-Benz"));
    assert_eq!(proper_noun("gran   cherokee").as_deref(), Some("Gran Cherokee"));
    assert_eq!(proper_noun("automático").as_deref(), Some("Automático"));
    assert_eq!(proper_noun("   "), None);
  }

  #[test]
  fn coded_values_upper_case() {
    assert_eq!(coded("suv").as_deref(), Some("SUV"));
    assert_eq!(coded(""), None);
  }

  #[test]
  fn yes_no_tokens() {
    assert!(flag(Some("Sí")));
    assert!(flag(Some("Si")));
    assert!(flag(Some(" SÍ ")));
    assert!(!flag(Some("No")));
    assert!(!flag(Some("Opcional")));
    assert!(!flag(None));
  }

  #[test]
  fn numeric_coercion() {
    assert_eq!(int("$254,999"), Some(254_999));
    assert_eq!(int("45 000"), Some(45_000));
    assert_eq!(int("n/a"), None);
    assert_eq!(int("3.5"), None);
    assert_eq!(float("3.5"), Some(3.5));
    assert_eq!(float("1,234.5"), Some(1234.5));
    assert_eq!(float("inf"), None);
    assert_eq!(float(""), None);
  }
}
