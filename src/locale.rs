//! Locale negotiation from the `Accept-Language` header.
//!
//! Entries are ordered by their `q` weight, highest first; entries with the same weight
//! keep their order in the header. Entries weighted `q=0`, entries with an unparsable
//! weight and the `*` wildcard name no usable locale and are dropped.
//!
//! # Examples
//!
//! ```rust
//! use tako_request::locale::parse_locales;
//!
//! let locales = parse_locales("en;q=0.8, fr-FR, de;q=0.9");
//! let tags: Vec<_> = locales.iter().map(ToString::to_string).collect();
//! assert_eq!(tags, ["fr-FR", "de", "en"]);
//! ```

use std::{fmt, str::FromStr};

use serde::Deserialize;

/// A language with an optional region, such as `en` or `fr-FR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Locale {
  language: String,
  country: Option<String>,
}

impl Locale {
  /// Builds a locale; the language is lowercased and the country uppercased.
  pub fn new(language: &str, country: Option<&str>) -> Self {
    Self {
      language: language.to_ascii_lowercase(),
      country: country
        .filter(|c| !c.is_empty())
        .map(|c| c.to_ascii_uppercase()),
    }
  }

  pub fn language(&self) -> &str {
    &self.language
  }

  pub fn country(&self) -> Option<&str> {
    self.country.as_deref()
  }
}

impl Default for Locale {
  fn default() -> Self {
    Locale::new("en", Some("US"))
  }
}

/// Error for a language tag that names no locale.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid language tag: {0:?}")]
pub struct InvalidLocale(pub String);

impl FromStr for Locale {
  type Err = InvalidLocale;

  /// Parses `language[-script][-region]`, with `-` or `_` separators. Only the
  /// language and region are kept.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let tag = s.trim();
    let mut subtags = tag.split(['-', '_']);

    let language = subtags.next().unwrap_or_default();
    if language.is_empty()
      || language == "*"
      || !language.chars().all(|c| c.is_ascii_alphabetic())
    {
      return Err(InvalidLocale(s.to_string()));
    }

    // Region subtags are two letters or three digits; script subtags are skipped.
    let country = subtags.find(|sub| {
      (sub.len() == 2 && sub.chars().all(|c| c.is_ascii_alphabetic()))
        || (sub.len() == 3 && sub.chars().all(|c| c.is_ascii_digit()))
    });
    Ok(Locale::new(language, country))
  }
}

impl TryFrom<String> for Locale {
  type Error = InvalidLocale;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl fmt::Display for Locale {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.country {
      Some(country) => write!(f, "{}-{}", self.language, country),
      None => f.write_str(&self.language),
    }
  }
}

/// Parses an `Accept-Language` value into locales, most preferred first.
///
/// Returns an empty list when no entry names a usable locale; callers fall back to a
/// default in that case.
pub fn parse_locales(header: &str) -> Vec<Locale> {
  let mut weighted: Vec<(Locale, f32)> = Vec::new();

  for entry in header.split(',') {
    let mut params = entry.split(';');
    let tag = params.next().unwrap_or_default().trim();
    if tag.is_empty() {
      continue;
    }

    let mut quality = 1.0_f32;
    let mut valid = true;
    for param in params {
      let Some((key, value)) = param.split_once('=') else {
        continue;
      };
      if !key.trim().eq_ignore_ascii_case("q") {
        continue;
      }
      match value.trim().parse::<f32>() {
        Ok(q) if (0.0..=1.0).contains(&q) => quality = q,
        _ => valid = false,
      }
    }

    if !valid {
      tracing::debug!(entry, "ignoring Accept-Language entry with invalid weight");
      continue;
    }
    if quality == 0.0 {
      continue;
    }

    match tag.parse::<Locale>() {
      Ok(locale) => weighted.push((locale, quality)),
      Err(_) => continue,
    }
  }

  // Stable sort keeps header order among equal weights.
  weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

  weighted.into_iter().map(|(locale, _)| locale).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tags(header: &str) -> Vec<String> {
    parse_locales(header).iter().map(ToString::to_string).collect()
  }

  #[test]
  fn primary_is_first_entry() {
    assert_eq!(tags("fr-FR,en;q=0.8"), ["fr-FR", "en"]);
  }

  #[test]
  fn orders_by_weight_stably() {
    assert_eq!(
      tags("da, en-gb;q=0.8, en;q=0.7, de;q=0.8"),
      ["da", "en-GB", "de", "en"]
    );
  }

  #[test]
  fn drops_unusable_entries() {
    assert_eq!(tags("*, fr;q=0, en;q=abc, de;q=2, it"), ["it"]);
    assert!(tags("").is_empty());
    assert!(tags(" , ;q=0.5").is_empty());
  }

  #[test]
  fn locale_parsing() {
    let locale: Locale = "pt_br".parse().unwrap();
    assert_eq!(locale.language(), "pt");
    assert_eq!(locale.country(), Some("BR"));
    assert_eq!(locale.to_string(), "pt-BR");

    let locale: Locale = "zh-Hant-TW".parse().unwrap();
    assert_eq!(locale.to_string(), "zh-TW");

    let locale: Locale = "es-419".parse().unwrap();
    assert_eq!(locale.country(), Some("419"));

    assert!("".parse::<Locale>().is_err());
    assert!("*".parse::<Locale>().is_err());
    assert_eq!(Locale::default().to_string(), "en-US");
  }
}
