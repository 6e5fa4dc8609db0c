//! The per-request facade handed to handlers.
//!
//! A [`Request`] is built once from a [`RawExchange`] and the shared [`ServerConfig`],
//! used by the single task handling that exchange, and dropped when the request
//! completes. It owns the header, parameter and attribute stores, resolves scheme, host
//! and client address through the configured forwarded-header trust on every call, and
//! hands out the body exactly once.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use http::Method;
//! use tako_request::{config::ServerConfig, exchange::RawExchange, request::Request};
//!
//! # fn main() -> Result<(), tako_request::error::RequestError> {
//! let config = Arc::new(ServerConfig::default());
//! let exchange = RawExchange::new(
//!     Method::GET,
//!     "/hello?name=tako".parse().unwrap(),
//!     "127.0.0.1:8080".parse().unwrap(),
//!     "127.0.0.1:53000".parse().unwrap(),
//! )
//! .header("Host", "example.com");
//!
//! let req = Request::new(config, exchange)?;
//! assert_eq!(req.server_name(), "example.com");
//! assert_eq!(req.parameter("name"), Some("tako"));
//! assert_eq!(req.request_url(), "http://example.com:8080/hello");
//! # Ok(())
//! # }
//! ```

use std::{net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http::{Method, Uri, Version};
use once_cell::unsync::OnceCell;
use uuid::Uuid;

use crate::{
  attributes::AttributeStore,
  body::{BodyAccess, BodyReader, BodyState, BodyStream},
  charset::Charset,
  config::ServerConfig,
  error::RequestError,
  exchange::RawExchange,
  forwarded::{ForwardedHeaderResolver, host_string},
  headers::HeaderStore,
  locale::{Locale, parse_locales},
  params::{ParameterMap, ParameterStore},
  types::AttributeValue,
};

/// Methods whose `Content-Length` is honoured.
const BODY_METHODS: [Method; 4] = [Method::POST, Method::PUT, Method::DELETE, Method::PATCH];

/// Structured view of one inbound HTTP request.
#[derive(Debug)]
pub struct Request {
  config: Arc<ServerConfig>,
  method: Method,
  version: Version,
  uri: Uri,
  local_addr: SocketAddr,
  remote_addr: SocketAddr,
  body: Bytes,
  headers: HeaderStore,
  parameters: ParameterStore,
  attributes: AttributeStore,
  charset: Charset,
  content_length: u64,
  request_id: OnceCell<String>,
  body_state: BodyState,
}

impl Request {
  /// Adapts `exchange` into a request.
  ///
  /// `Content-Length` is read only for `POST`, `PUT`, `DELETE` and `PATCH`; for any
  /// other method, and when the header is absent, the content length is zero.
  ///
  /// # Errors
  ///
  /// [`RequestError::MalformedHeader`] if a body method carries a `Content-Length`
  /// that is not a non-negative integer.
  pub fn new(config: Arc<ServerConfig>, exchange: RawExchange) -> Result<Self, RequestError> {
    let charset = config.request_encoding;
    let parameters = ParameterStore::new(&exchange, charset);

    let RawExchange {
      method,
      uri,
      version,
      headers,
      body,
      local_addr,
      remote_addr,
    } = exchange;
    let headers = HeaderStore::from_lines(headers);

    let content_length = if BODY_METHODS.contains(&method) {
      content_length(&headers)?
    } else {
      0
    };

    tracing::debug!(
      method = %method,
      uri = %uri,
      remote = %remote_addr,
      content_length,
      "adapted request"
    );

    Ok(Self {
      config,
      method,
      version,
      uri,
      local_addr,
      remote_addr,
      body,
      headers,
      parameters,
      attributes: AttributeStore::new(),
      charset,
      content_length,
      request_id: OnceCell::new(),
      body_state: BodyState::Unread,
    })
  }

  fn resolver(&self) -> ForwardedHeaderResolver<'_> {
    ForwardedHeaderResolver::new(&self.config.forwarded_headers, &self.headers)
  }

  pub fn config(&self) -> &ServerConfig {
    &self.config
  }

  // Method, protocol and scheme.

  pub fn method(&self) -> &Method {
    &self.method
  }

  /// Protocol name and version, e.g. `HTTP/1.1`.
  pub fn protocol(&self) -> &'static str {
    match self.version {
      Version::HTTP_09 => "HTTP/0.9",
      Version::HTTP_10 => "HTTP/1.0",
      Version::HTTP_2 => "HTTP/2.0",
      Version::HTTP_3 => "HTTP/3.0",
      _ => "HTTP/1.1",
    }
  }

  pub fn version(&self) -> Version {
    self.version
  }

  /// Scheme as seen by the client; see [`ForwardedHeaderResolver::scheme`].
  pub fn scheme(&self) -> &str {
    self.resolver().scheme()
  }

  /// `true` when [`scheme`](Self::scheme) is `https`, ignoring case.
  pub fn is_secure(&self) -> bool {
    self.resolver().is_secure()
  }

  // Server, remote and local coordinates.

  /// Host name as seen by the client; see [`ForwardedHeaderResolver::host`].
  pub fn server_name(&self) -> String {
    self.resolver().host(&self.local_addr)
  }

  /// Port of the local socket the request arrived on.
  pub fn server_port(&self) -> u16 {
    self.local_addr.port()
  }

  /// Client address; see [`ForwardedHeaderResolver::client_addr`].
  pub fn remote_addr(&self) -> String {
    self.resolver().client_addr(&self.remote_addr)
  }

  /// Same as [`remote_addr`](Self::remote_addr); names are never resolved through DNS.
  pub fn remote_host(&self) -> String {
    self.remote_addr()
  }

  pub fn remote_port(&self) -> u16 {
    self.remote_addr.port()
  }

  pub fn local_addr(&self) -> String {
    host_string(&self.local_addr)
  }

  /// Same as [`local_addr`](Self::local_addr); no DNS lookup is made.
  pub fn local_name(&self) -> String {
    self.local_addr()
  }

  pub fn local_port(&self) -> u16 {
    self.local_addr.port()
  }

  /// Socket addresses as delivered by the connector, untouched by forwarded headers.
  pub fn socket_addrs(&self) -> (SocketAddr, SocketAddr) {
    (self.local_addr, self.remote_addr)
  }

  // Target.

  /// Raw request path.
  pub fn request_uri(&self) -> &str {
    self.uri.path()
  }

  /// Raw query string, without the leading `?`.
  pub fn query_string(&self) -> Option<&str> {
    self.uri.query()
  }

  pub fn uri(&self) -> &Uri {
    &self.uri
  }

  /// Reconstructs `scheme://host:port/path`.
  pub fn request_url(&self) -> String {
    let scheme = self.scheme();
    let host = self.server_name();
    let path = self.request_uri();
    let mut url = String::with_capacity(scheme.len() + host.len() + path.len() + 10);
    url.push_str(scheme);
    url.push_str("://");
    url.push_str(&host);
    url.push(':');
    url.push_str(&self.server_port().to_string());
    url.push_str(path);
    url
  }

  // Headers.

  pub fn headers_store(&self) -> &HeaderStore {
    &self.headers
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.header(name)
  }

  pub fn headers<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + use<'a> {
    self.headers.headers(name)
  }

  pub fn header_names(&self) -> impl Iterator<Item = &str> {
    self.headers.header_names()
  }

  /// See [`HeaderStore::int_header`].
  pub fn int_header(&self, name: &str) -> Result<i64, RequestError> {
    self.headers.int_header(name)
  }

  /// See [`HeaderStore::date_header`].
  pub fn date_header(&self, name: &str) -> Result<i64, RequestError> {
    self.headers.date_header(name)
  }

  pub fn content_type(&self) -> Option<&str> {
    self.headers.header(http::header::CONTENT_TYPE.as_str())
  }

  /// Declared body length; zero unless the method carries a body.
  pub fn content_length(&self) -> u64 {
    self.content_length
  }

  // Character encoding.

  /// Name of the encoding used for the body reader and parameters.
  pub fn character_encoding(&self) -> &'static str {
    self.charset.name()
  }

  pub fn charset(&self) -> Charset {
    self.charset
  }

  /// Overrides the request encoding.
  ///
  /// The reader decodes with the new encoding from now on. Parameters pick it up only
  /// if none has been read yet.
  ///
  /// # Errors
  ///
  /// [`RequestError::UnsupportedEncoding`] if `name` is not a known encoding; the
  /// current encoding is kept.
  pub fn set_character_encoding(&mut self, name: &str) -> Result<(), RequestError> {
    let charset: Charset = name.parse()?;
    self.charset = charset;
    self.parameters.set_charset(charset);
    Ok(())
  }

  // Parameters.

  pub fn parameter(&self, name: &str) -> Option<&str> {
    self.parameters.parameter(name)
  }

  pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
    self.parameters.parameter_names()
  }

  pub fn parameter_values(&self, name: &str) -> Option<&[String]> {
    self.parameters.parameter_values(name)
  }

  pub fn parameter_map(&self) -> &ParameterMap {
    self.parameters.parameter_map()
  }

  // Body.

  /// Hands out the body as bytes.
  ///
  /// # Errors
  ///
  /// [`RequestError::BodyConsumed`] if the body was already handed out by this method
  /// or by [`reader`](Self::reader).
  pub fn input_stream(&mut self) -> Result<BodyStream, RequestError> {
    self.body_state.consume(BodyAccess::InputStream)?;
    Ok(BodyStream::new(self.body.clone()))
  }

  /// Hands out the body as text decoded with the current character encoding.
  ///
  /// # Errors
  ///
  /// [`RequestError::BodyConsumed`] if the body was already handed out by this method
  /// or by [`input_stream`](Self::input_stream).
  pub fn reader(&mut self) -> Result<BodyReader, RequestError> {
    self.body_state.consume(BodyAccess::Reader)?;
    Ok(BodyReader::new(&self.body, self.charset))
  }

  pub fn body_state(&self) -> BodyState {
    self.body_state
  }

  // Attributes.

  pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
    self.attributes.get(name)
  }

  /// Attribute downcast to `T`; `None` if absent or of another type.
  pub fn attribute_as<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
    self.attributes.get_as(name)
  }

  /// Stores an attribute; `None` removes it.
  pub fn set_attribute(&mut self, name: impl Into<String>, value: Option<AttributeValue>) {
    self.attributes.set(name, value);
  }

  pub fn insert_attribute<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) {
    self.attributes.insert(name, value);
  }

  pub fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue> {
    self.attributes.remove(name)
  }

  pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
    self.attributes.names()
  }

  // Locale.

  /// Most preferred locale from `Accept-Language`, else the configured default.
  pub fn locale(&self) -> Locale {
    self.locales()
      .into_iter()
      .next()
      .unwrap_or_else(|| self.config.default_locale.clone())
  }

  /// Locales from `Accept-Language` in preference order, else the configured default
  /// alone.
  pub fn locales(&self) -> Vec<Locale> {
    let parsed = self
      .headers
      .header(http::header::ACCEPT_LANGUAGE.as_str())
      .map(parse_locales)
      .unwrap_or_default();

    if parsed.is_empty() {
      vec![self.config.default_locale.clone()]
    } else {
      parsed
    }
  }

  // Identifiers.

  /// Opaque identifier of this request, generated on first call and stable after.
  pub fn request_id(&self) -> &str {
    self.request_id
      .get_or_init(|| Uuid::new_v4().to_string())
      .as_str()
  }

  /// Protocol-level request id; HTTP/1.x has none, so this is empty.
  pub fn protocol_request_id(&self) -> &str {
    ""
  }
}

fn content_length(headers: &HeaderStore) -> Result<u64, RequestError> {
  let name = http::header::CONTENT_LENGTH.as_str();
  match headers.int_header(name)? {
    -1 if !headers.contains(name) => Ok(0),
    len => u64::try_from(len).map_err(|_| {
      RequestError::malformed(name, headers.header(name).unwrap_or_default(), "length")
    }),
  }
}

#[cfg(test)]
mod tests {
  use std::io::Read;

  use super::*;
  use crate::config::ForwardedHeaders;

  fn exchange(method: Method, uri: &str) -> RawExchange {
    RawExchange::new(
      method,
      uri.parse().unwrap(),
      "127.0.0.1:8080".parse().unwrap(),
      "203.0.113.50:61000".parse().unwrap(),
    )
  }

  fn request(exchange: RawExchange) -> Request {
    Request::new(Arc::new(ServerConfig::default()), exchange).unwrap()
  }

  #[test]
  fn content_length_only_for_body_methods() {
    for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
      let req = request(exchange(method, "/").header("Content-Length", "42"));
      assert_eq!(req.content_length(), 42);
    }
    for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
      let req = request(exchange(method, "/").header("Content-Length", "42"));
      assert_eq!(req.content_length(), 0);
    }
    assert_eq!(request(exchange(Method::POST, "/")).content_length(), 0);
  }

  #[test]
  fn malformed_content_length_fails_construction() {
    let config = Arc::new(ServerConfig::default());
    for value in ["forty-two", "-1", "-5"] {
      let result = Request::new(
        config.clone(),
        exchange(Method::POST, "/").header("content-length", value),
      );
      assert!(matches!(result, Err(RequestError::MalformedHeader { .. })));
    }

    // Not consulted for methods without a body.
    let req = Request::new(
      config,
      exchange(Method::GET, "/").header("content-length", "forty-two"),
    );
    assert!(req.is_ok());
  }

  #[test]
  fn stream_then_any_accessor_fails() {
    let mut req = request(exchange(Method::POST, "/").body("payload"));
    let mut body = String::new();
    req.input_stream()
      .unwrap()
      .read_to_string(&mut body)
      .unwrap();
    assert_eq!(body, "payload");

    let err = req.input_stream().unwrap_err();
    assert!(err.to_string().contains("input_stream()"));
    let err = req.reader().unwrap_err();
    assert!(matches!(
      err,
      RequestError::BodyConsumed {
        first: BodyAccess::InputStream
      }
    ));
  }

  #[test]
  fn reader_then_any_accessor_fails() {
    let mut req = request(exchange(Method::POST, "/").body("payload"));
    assert_eq!(req.reader().unwrap().into_string(), "payload");
    assert_eq!(req.body_state(), BodyState::Consumed(BodyAccess::Reader));

    for _ in 0..2 {
      assert!(matches!(
        req.input_stream(),
        Err(RequestError::BodyConsumed {
          first: BodyAccess::Reader
        })
      ));
      assert!(req.reader().is_err());
    }
  }

  #[test]
  fn reader_uses_current_encoding() {
    let mut req = request(exchange(Method::POST, "/").body(Bytes::from_static(b"na\xefve")));
    req.set_character_encoding("ISO-8859-1").unwrap();
    assert_eq!(req.character_encoding(), "ISO-8859-1");
    assert_eq!(req.reader().unwrap().into_string(), "naïve");
  }

  #[test]
  fn unknown_encoding_keeps_current() {
    let mut req = request(exchange(Method::GET, "/"));
    assert!(matches!(
      req.set_character_encoding("x-unknown"),
      Err(RequestError::UnsupportedEncoding(_))
    ));
    assert_eq!(req.charset(), Charset::Utf8);
  }

  #[test]
  fn request_id_is_lazy_and_stable() {
    let req = request(exchange(Method::GET, "/"));
    let first = req.request_id().to_string();
    assert!(Uuid::parse_str(&first).is_ok());
    assert_eq!(req.request_id(), first);

    let other = request(exchange(Method::GET, "/"));
    assert_ne!(other.request_id(), first);
    assert_eq!(req.protocol_request_id(), "");
  }

  #[test]
  fn coordinates_and_url() {
    let req = request(
      exchange(Method::GET, "/a/b?x=1")
        .header("Host", "example.com:9000")
        .header("X-Forwarded-For", "1.2.3.4"),
    );
    assert_eq!(req.server_name(), "example.com");
    assert_eq!(req.server_port(), 8080);
    assert_eq!(req.remote_addr(), "203.0.113.50");
    assert_eq!(req.remote_host(), "203.0.113.50");
    assert_eq!(req.remote_port(), 61000);
    assert_eq!(req.local_addr(), "127.0.0.1");
    assert_eq!(req.local_name(), "127.0.0.1");
    assert_eq!(req.local_port(), 8080);
    assert_eq!(req.request_uri(), "/a/b");
    assert_eq!(req.query_string(), Some("x=1"));
    assert_eq!(req.request_url(), "http://example.com:8080/a/b");
    assert_eq!(req.protocol(), "HTTP/1.1");
  }

  #[test]
  fn forwarded_trust_is_read_on_every_call() {
    let config = ServerConfig::default().with_forwarded_headers(ForwardedHeaders {
      forwarded_proto: "X-Forwarded-Proto".into(),
      forwarded_host: "X-Forwarded-Host".into(),
      forwarded_for: "X-Forwarded-For".into(),
    });
    let req = Request::new(
      Arc::new(config),
      exchange(Method::GET, "/login")
        .header("Host", "backend:8080")
        .header("X-Forwarded-Proto", "https")
        .header("X-Forwarded-Host", "www.example.com")
        .header("X-Forwarded-For", "198.51.100.7, 10.0.0.1"),
    )
    .unwrap();

    assert_eq!(req.scheme(), "https");
    assert!(req.is_secure());
    assert_eq!(req.server_name(), "www.example.com");
    assert_eq!(req.remote_addr(), "198.51.100.7");
    assert_eq!(req.request_url(), "https://www.example.com:8080/login");
  }

  #[test]
  fn locale_negotiation() {
    let req = request(exchange(Method::GET, "/").header("Accept-Language", "fr-FR,en;q=0.8"));
    assert_eq!(req.locale().to_string(), "fr-FR");
    let tags: Vec<_> = req.locales().iter().map(ToString::to_string).collect();
    assert_eq!(tags, ["fr-FR", "en"]);

    let req = request(exchange(Method::GET, "/"));
    assert_eq!(req.locale(), Locale::default());
    assert_eq!(req.locales(), vec![Locale::default()]);

    let req = request(exchange(Method::GET, "/").header("Accept-Language", "*"));
    assert_eq!(req.locale(), Locale::default());
  }

  #[test]
  fn attributes_round_trip() {
    let mut req = request(exchange(Method::GET, "/"));
    req.insert_attribute("user", String::from("alice"));
    req.insert_attribute("attempts", 3u8);
    assert_eq!(
      req.attribute_as::<String>("user").as_deref().map(String::as_str),
      Some("alice")
    );
    assert_eq!(req.attribute_names().collect::<Vec<_>>(), ["user", "attempts"]);

    req.set_attribute("user", None);
    assert!(req.attribute("user").is_none());
    assert!(req.remove_attribute("attempts").is_some());
    assert_eq!(req.attribute_names().count(), 0);
  }

  #[test]
  fn protocol_from_version() {
    let req = request(exchange(Method::GET, "/").version(Version::HTTP_10));
    assert_eq!(req.protocol(), "HTTP/1.0");
    assert_eq!(req.version(), Version::HTTP_10);
  }
}
