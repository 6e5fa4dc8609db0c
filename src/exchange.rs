//! The raw inbound exchange handed over by the connector.
//!
//! A [`RawExchange`] carries everything the connector already parsed: method, target URI,
//! header lines in arrival order, the fully buffered body and both socket addresses. It
//! is immutable once built and consumed by [`Request::new`](crate::request::Request::new).
//!
//! # Examples
//!
//! ```rust
//! use tako_request::exchange::RawExchange;
//! use http::Method;
//!
//! let exchange = RawExchange::new(
//!     Method::POST,
//!     "/login?next=/home".parse().unwrap(),
//!     "127.0.0.1:8080".parse().unwrap(),
//!     "10.0.0.7:51234".parse().unwrap(),
//! )
//! .header("Host", "example.com")
//! .header("Content-Type", "application/x-www-form-urlencoded")
//! .body("user=alice");
//! ```

use std::net::SocketAddr;

use bytes::Bytes;
use http::{Method, Uri, Version, request::Parts};
use http_body::Body;
use http_body_util::BodyExt;

use crate::types::BoxError;

/// One raw HTTP request as delivered by the connector.
#[derive(Debug, Clone)]
pub struct RawExchange {
  pub method: Method,
  pub uri: Uri,
  pub version: Version,
  /// Header lines in arrival order, names as received.
  pub headers: Vec<(String, String)>,
  pub body: Bytes,
  pub local_addr: SocketAddr,
  pub remote_addr: SocketAddr,
}

impl RawExchange {
  /// Creates an HTTP/1.1 exchange with no headers and an empty body.
  pub fn new(method: Method, uri: Uri, local_addr: SocketAddr, remote_addr: SocketAddr) -> Self {
    Self {
      method,
      uri,
      version: Version::HTTP_11,
      headers: Vec::new(),
      body: Bytes::new(),
      local_addr,
      remote_addr,
    }
  }

  /// Appends a header line.
  pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// Replaces the body.
  pub fn body(mut self, body: impl Into<Bytes>) -> Self {
    self.body = body.into();
    self
  }

  pub fn version(mut self, version: Version) -> Self {
    self.version = version;
    self
  }

  /// Builds an exchange from `http` request parts and an already buffered body.
  ///
  /// Header names from an `http::HeaderMap` are lowercase; lookups are
  /// case-insensitive so this only affects enumeration.
  pub fn from_parts(
    parts: Parts,
    body: Bytes,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
  ) -> Self {
    let headers = parts
      .headers
      .iter()
      .map(|(name, value)| {
        (
          name.as_str().to_string(),
          String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
      })
      .collect();

    Self {
      method: parts.method,
      uri: parts.uri,
      version: parts.version,
      headers,
      body,
      local_addr,
      remote_addr,
    }
  }

  /// Buffers the whole body of `req` and builds an exchange from it.
  ///
  /// # Errors
  ///
  /// Returns the body error if reading any frame fails.
  pub async fn collect<B>(
    req: http::Request<B>,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
  ) -> Result<Self, BoxError>
  where
    B: Body,
    B::Error: Into<BoxError>,
  {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
      Ok(collected) => collected.to_bytes(),
      Err(err) => return Err(err.into()),
    };
    Ok(Self::from_parts(parts, body, local_addr, remote_addr))
  }
}
