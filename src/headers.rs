//! Case-insensitive header storage with typed accessors.
//!
//! Header names are matched ignoring ASCII case no matter how they arrived on the wire.
//! The spelling seen first is kept for enumeration, so `X-Trace-Id` followed by
//! `x-trace-id` is listed once, as `X-Trace-Id`, with both values.
//!
//! # Examples
//!
//! ```rust
//! use tako_request::headers::HeaderStore;
//!
//! let headers = HeaderStore::from_lines([("Content-Length", "42"), ("Accept", "text/html")]);
//! assert_eq!(headers.header("content-length"), Some("42"));
//! assert_eq!(headers.int_header("CONTENT-LENGTH").unwrap(), 42);
//! assert_eq!(headers.int_header("X-Missing").unwrap(), -1);
//! ```

use std::{collections::HashMap, time::UNIX_EPOCH};

use smallvec::SmallVec;

use crate::error::RequestError;

#[derive(Debug, Clone)]
struct HeaderEntry {
  name: String,
  values: SmallVec<[String; 1]>,
}

/// Ordered mapping of header names to their values.
#[derive(Debug, Clone, Default)]
pub struct HeaderStore {
  entries: Vec<HeaderEntry>,
  /// Lowercased name to position in `entries`.
  index: HashMap<String, usize>,
}

impl HeaderStore {
  /// Creates an empty store.
  pub fn new() -> Self {
    Self::default()
  }

  /// Builds a store from header lines in arrival order.
  pub fn from_lines<I, K, V>(lines: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let mut store = Self::new();
    for (name, value) in lines {
      store.append(name.into(), value.into());
    }
    store
  }

  fn append(&mut self, name: String, value: String) {
    let key = name.to_ascii_lowercase();
    match self.index.get(&key) {
      Some(&idx) => self.entries[idx].values.push(value),
      None => {
        let mut values = SmallVec::new();
        values.push(value);
        self.index.insert(key, self.entries.len());
        self.entries.push(HeaderEntry { name, values });
      }
    }
  }

  fn entry(&self, name: &str) -> Option<usize> {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
      self.index.get(&name.to_ascii_lowercase()).copied()
    } else {
      self.index.get(name).copied()
    }
  }

  /// First value of the header, if present.
  pub fn header(&self, name: &str) -> Option<&str> {
    self.entry(name)
      .and_then(|idx| self.entries[idx].values.first())
      .map(String::as_str)
  }

  /// All values of the header in arrival order. Empty when the header is absent.
  pub fn headers<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + use<'a> {
    self.entry(name)
      .map(|idx| self.entries[idx].values.as_slice())
      .unwrap_or_default()
      .iter()
      .map(String::as_str)
  }

  /// Distinct header names in first-seen order, original casing preserved.
  pub fn header_names(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|e| e.name.as_str())
  }

  /// Returns `true` if the header is present.
  pub fn contains(&self, name: &str) -> bool {
    self.entry(name).is_some()
  }

  /// Parses the first value as an integer.
  ///
  /// Returns `-1` when the header is absent and
  /// [`RequestError::MalformedHeader`] when the value is not an integer.
  pub fn int_header(&self, name: &str) -> Result<i64, RequestError> {
    match self.header(name) {
      None => Ok(-1),
      Some(value) => value
        .trim()
        .parse::<i64>()
        .map_err(|_| RequestError::malformed(name, value, "integer")),
    }
  }

  /// Parses the first value as an HTTP-date, in milliseconds since the Unix epoch.
  ///
  /// IMF-fixdate, RFC 850 and asctime forms are accepted. Returns `-1` when the header
  /// is absent and [`RequestError::MalformedHeader`] when the value is not a date.
  pub fn date_header(&self, name: &str) -> Result<i64, RequestError> {
    let Some(value) = self.header(name) else {
      return Ok(-1);
    };

    let time = httpdate::parse_http_date(value.trim())
      .map_err(|_| RequestError::malformed(name, value, "HTTP-date"))?;
    let since_epoch = time
      .duration_since(UNIX_EPOCH)
      .map_err(|_| RequestError::malformed(name, value, "HTTP-date"))?;

    i64::try_from(since_epoch.as_millis())
      .map_err(|_| RequestError::malformed(name, value, "HTTP-date"))
  }

  /// Iterates `(name, value)` pairs, grouped by name.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries
      .iter()
      .flat_map(|e| e.values.iter().map(move |v| (e.name.as_str(), v.as_str())))
  }

  /// Number of distinct header names.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store() -> HeaderStore {
    HeaderStore::from_lines([
      ("Host", "example.com"),
      ("X-Trace-Id", "abc"),
      ("Accept", "text/html"),
      ("x-trace-id", "def"),
      ("If-Modified-Since", "Sun, 06 Nov 1994 08:49:37 GMT"),
      ("Content-Length", "12x"),
    ])
  }

  #[test]
  fn lookup_ignores_case() {
    let headers = store();
    for name in ["host", "HOST", "Host", "hOsT"] {
      assert_eq!(headers.header(name), Some("example.com"));
    }
    assert_eq!(headers.header("missing"), None);
  }

  #[test]
  fn repeated_headers_keep_order_and_first_spelling() {
    let headers = store();
    let values: Vec<_> = headers.headers("X-TRACE-ID").collect();
    assert_eq!(values, ["abc", "def"]);
    assert_eq!(headers.header("x-trace-id"), Some("abc"));

    let names: Vec<_> = headers.header_names().collect();
    assert_eq!(
      names,
      [
        "Host",
        "X-Trace-Id",
        "Accept",
        "If-Modified-Since",
        "Content-Length"
      ]
    );
    assert_eq!(headers.len(), 5);
    assert_eq!(headers.headers("missing").count(), 0);
  }

  #[test]
  fn int_header_absent_and_malformed() {
    let headers = store();
    assert_eq!(headers.int_header("X-Missing").unwrap(), -1);

    let err = headers.int_header("content-length").unwrap_err();
    assert!(matches!(
      err,
      RequestError::MalformedHeader { ref value, expected: "integer", .. } if value == "12x"
    ));

    let headers = HeaderStore::from_lines([("Max-Forwards", " 10 ")]);
    assert_eq!(headers.int_header("max-forwards").unwrap(), 10);
  }

  #[test]
  fn date_header_parses_http_dates() {
    let headers = store();
    assert_eq!(
      headers.date_header("if-modified-since").unwrap(),
      784_111_777_000
    );
    assert_eq!(headers.date_header("Date").unwrap(), -1);

    let headers = HeaderStore::from_lines([("Date", "yesterday")]);
    assert!(matches!(
      headers.date_header("date"),
      Err(RequestError::MalformedHeader { expected: "HTTP-date", .. })
    ));
  }

  #[test]
  fn many_distinct_headers() {
    let lines: Vec<_> = (0..20_000)
      .map(|i| (format!("X-Header-{i}"), i.to_string()))
      .collect();
    let headers = HeaderStore::from_lines(lines);

    assert_eq!(headers.len(), 20_000);
    assert_eq!(headers.header("x-header-19999"), Some("19999"));
    assert_eq!(headers.int_header("X-HEADER-42").unwrap(), 42);
    assert_eq!(headers.header_names().next(), Some("X-Header-0"));
  }
}
