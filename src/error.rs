//! Error types raised by the request adaptation layer.
//!
//! Every failure is reported synchronously at the call that caused it. The layer never
//! turns an error into an HTTP response on its own; handlers decide what to send back and
//! may use [`RequestError::status_code`] as a hint.

use http::StatusCode;

use crate::body::BodyAccess;

/// Errors surfaced by [`Request`](crate::request::Request) and its stores.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
  /// The body was already handed out by `first`.
  #[error("Cannot reopen input stream after {first} was called.")]
  BodyConsumed { first: BodyAccess },

  /// The operation is not valid in the current state.
  #[error("{0}")]
  IllegalState(&'static str),

  /// The capability has no backing implementation.
  #[error("unsupported operation: {0}")]
  Unsupported(&'static str),

  /// A header value could not be parsed as the requested type.
  #[error("malformed header {name}: expected {expected}, got {value:?}")]
  MalformedHeader {
    name: String,
    value: String,
    expected: &'static str,
  },

  /// The character encoding name is not known.
  #[error("unsupported character encoding: {0}")]
  UnsupportedEncoding(String),
}

impl RequestError {
  pub(crate) fn malformed(name: &str, value: &str, expected: &'static str) -> Self {
    Self::MalformedHeader {
      name: name.to_string(),
      value: value.to_string(),
      expected,
    }
  }

  /// Suggested response status for handlers that want to report the error.
  pub fn status_code(&self) -> StatusCode {
    match self {
      RequestError::MalformedHeader { .. } => StatusCode::BAD_REQUEST,
      RequestError::UnsupportedEncoding(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
      RequestError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
      RequestError::BodyConsumed { .. } | RequestError::IllegalState(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}
