//! Character encodings accepted for request bodies and parameters.

use std::{borrow::Cow, fmt, str::FromStr};

use serde::Deserialize;

use crate::error::RequestError;

/// A request character encoding.
///
/// Names are matched case-insensitively, so `utf-8`, `UTF8` and `Utf-8` are the same
/// encoding. Anything else is rejected with [`RequestError::UnsupportedEncoding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Charset {
  #[default]
  Utf8,
  Latin1,
  Ascii,
}

impl Charset {
  /// Canonical name of the encoding.
  pub fn name(&self) -> &'static str {
    match self {
      Charset::Utf8 => "UTF-8",
      Charset::Latin1 => "ISO-8859-1",
      Charset::Ascii => "US-ASCII",
    }
  }

  /// Decodes `bytes`, replacing malformed input with U+FFFD.
  pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
    match self {
      Charset::Utf8 => String::from_utf8_lossy(bytes),
      Charset::Latin1 => {
        if bytes.is_ascii() {
          // ASCII is valid UTF-8.
          String::from_utf8_lossy(bytes)
        } else {
          Cow::Owned(bytes.iter().map(|&b| b as char).collect())
        }
      }
      Charset::Ascii => {
        if bytes.is_ascii() {
          String::from_utf8_lossy(bytes)
        } else {
          Cow::Owned(
            bytes
              .iter()
              .map(|&b| {
                if b.is_ascii() {
                  b as char
                } else {
                  char::REPLACEMENT_CHARACTER
                }
              })
              .collect(),
          )
        }
      }
    }
  }
}

impl FromStr for Charset {
  type Err = RequestError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let name = s.trim().to_ascii_lowercase();
    match name.as_str() {
      "utf-8" | "utf8" => Ok(Charset::Utf8),
      "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1" => Ok(Charset::Latin1),
      "us-ascii" | "ascii" => Ok(Charset::Ascii),
      _ => Err(RequestError::UnsupportedEncoding(s.to_string())),
    }
  }
}

impl TryFrom<String> for Charset {
  type Error = RequestError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl fmt::Display for Charset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
