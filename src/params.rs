//! Request parameters from the query string and form-encoded bodies.
//!
//! Parameters are parsed on first use and cached. The character encoding used to decode
//! them can be changed until that first access; afterwards the cached values stay as they
//! are and further changes are ignored.
//!
//! Query-string pairs come first. When the `Content-Type` is
//! `application/x-www-form-urlencoded`, the body pairs are appended, so a name present in
//! both keeps its query values ahead of its body values.
//!
//! # Examples
//!
//! ```rust
//! use tako_request::{charset::Charset, exchange::RawExchange, params::ParameterStore};
//! use http::Method;
//!
//! let exchange = RawExchange::new(
//!     Method::GET,
//!     "/search?q=rust&tag=web&tag=http".parse().unwrap(),
//!     "127.0.0.1:8080".parse().unwrap(),
//!     "127.0.0.1:50000".parse().unwrap(),
//! );
//!
//! let params = ParameterStore::new(&exchange, Charset::Utf8);
//! assert_eq!(params.parameter("q"), Some("rust"));
//! assert_eq!(params.parameter_values("tag").unwrap(), ["web", "http"]);
//! ```

use std::{borrow::Cow, collections::HashMap};

use bytes::Bytes;
use once_cell::unsync::OnceCell;

use crate::{charset::Charset, exchange::RawExchange};

/// Name to values mapping, names in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
  entries: Vec<(String, Vec<String>)>,
  index: HashMap<String, usize>,
}

impl ParameterMap {
  pub fn new() -> Self {
    Self::default()
  }

  fn push(&mut self, name: String, value: String) {
    match self.index.get(&name) {
      Some(&idx) => self.entries[idx].1.push(value),
      None => {
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, vec![value]));
      }
    }
  }

  /// All values of `name`, or `None` when the parameter is absent.
  pub fn get(&self, name: &str) -> Option<&[String]> {
    self
      .index
      .get(name)
      .map(|&idx| self.entries[idx].1.as_slice())
  }

  /// First value of `name`.
  pub fn first(&self, name: &str) -> Option<&str> {
    self.get(name)
      .and_then(|values| values.first())
      .map(String::as_str)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(n, _)| n.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
    self.entries
      .iter()
      .map(|(n, values)| (n.as_str(), values.as_slice()))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Lazily parsed request parameters.
#[derive(Debug)]
pub struct ParameterStore {
  query: Option<String>,
  form: Option<Bytes>,
  charset: Charset,
  parsed: OnceCell<ParameterMap>,
}

impl ParameterStore {
  /// Captures the query string and, for form-encoded requests, the body.
  ///
  /// Nothing is decoded until the first parameter lookup.
  pub fn new(exchange: &RawExchange, charset: Charset) -> Self {
    let form = exchange
      .headers
      .iter()
      .find(|(name, _)| name.eq_ignore_ascii_case(http::header::CONTENT_TYPE.as_str()))
      .filter(|(_, value)| is_form_urlencoded(value))
      .map(|_| exchange.body.clone());

    Self {
      query: exchange.uri.query().map(str::to_string),
      form,
      charset,
      parsed: OnceCell::new(),
    }
  }

  /// Encoding used to decode parameters.
  pub fn charset(&self) -> Charset {
    self.charset
  }

  /// Changes the decoding charset. Ignored once parameters have been parsed.
  pub fn set_charset(&mut self, charset: Charset) {
    if self.parsed.get().is_some() {
      tracing::debug!(
        charset = charset.name(),
        "parameters already parsed, charset change ignored"
      );
      return;
    }
    self.charset = charset;
  }

  /// Returns `true` once the parameters have been materialized.
  pub fn is_parsed(&self) -> bool {
    self.parsed.get().is_some()
  }

  /// The full parameter map, parsing it on first call.
  pub fn parameter_map(&self) -> &ParameterMap {
    self.parsed.get_or_init(|| {
      let mut map = ParameterMap::new();
      if let Some(query) = &self.query {
        parse_urlencoded(&mut map, query.as_bytes(), self.charset);
      }
      if let Some(form) = &self.form {
        parse_urlencoded(&mut map, form, self.charset);
      }
      tracing::trace!(count = map.len(), "parsed request parameters");
      map
    })
  }

  pub fn parameter(&self, name: &str) -> Option<&str> {
    self.parameter_map().first(name)
  }

  pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
    self.parameter_map().names()
  }

  pub fn parameter_values(&self, name: &str) -> Option<&[String]> {
    self.parameter_map().get(name)
  }
}

fn is_form_urlencoded(content_type: &str) -> bool {
  content_type
    .parse::<mime::Mime>()
    .map(|m| m.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
    .unwrap_or(false)
}

/// Decodes `application/x-www-form-urlencoded` pairs into `map`.
///
/// Empty segments and segments with an empty name are skipped; a segment without `=`
/// is a name with an empty value.
fn parse_urlencoded(map: &mut ParameterMap, input: &[u8], charset: Charset) {
  // Split on bytes; decoded components may not be UTF-8 until the charset is applied.
  for segment in input.split(|&b| b == b'&') {
    if segment.is_empty() {
      continue;
    }

    let (name, value) = match segment.iter().position(|&b| b == b'=') {
      Some(eq) => (&segment[..eq], &segment[eq + 1..]),
      None => (segment, &[][..]),
    };

    let name = decode_component(name, charset);
    if name.is_empty() {
      continue;
    }
    let value = decode_component(value, charset);
    map.push(name, value);
  }
}

fn decode_component(raw: &[u8], charset: Charset) -> String {
  let plus_decoded: Cow<'_, [u8]> = if raw.contains(&b'+') {
    Cow::Owned(
      raw.iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect(),
    )
  } else {
    Cow::Borrowed(raw)
  };

  let bytes = urlencoding::decode_binary(&plus_decoded);
  charset.decode(&bytes).into_owned()
}
