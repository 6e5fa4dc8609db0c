//! Scheme, host and client address resolution behind reverse proxies.
//!
//! Each of the three values can be taken from an operator-configured header. An empty
//! header name disables trust for that value and the resolver falls back to what the
//! socket says. Falling back is normal operation and never an error.
//!
//! # Security
//!
//! Trusting a forwarded header is an explicit opt-in. Enable it only when the process
//! sits behind a proxy that strips or overwrites client-supplied values of that same
//! header name. Otherwise any client can choose its own scheme, host or address.
//!
//! # Examples
//!
//! ```rust
//! use tako_request::{config::ForwardedHeaders, forwarded::ForwardedHeaderResolver};
//! use tako_request::headers::HeaderStore;
//!
//! let trust = ForwardedHeaders {
//!     forwarded_proto: "X-Forwarded-Proto".to_string(),
//!     ..Default::default()
//! };
//! let headers = HeaderStore::from_lines([("x-forwarded-proto", "https")]);
//!
//! let resolver = ForwardedHeaderResolver::new(&trust, &headers);
//! assert_eq!(resolver.scheme(), "https");
//! ```

use std::net::SocketAddr;

use crate::{config::ForwardedHeaders, headers::HeaderStore};

/// Scheme reported when no trusted protocol header applies.
pub const DEFAULT_SCHEME: &str = "http";

/// Resolves externally visible request coordinates from trusted headers.
#[derive(Debug, Clone, Copy)]
pub struct ForwardedHeaderResolver<'a> {
  trust: &'a ForwardedHeaders,
  headers: &'a HeaderStore,
}

impl<'a> ForwardedHeaderResolver<'a> {
  pub fn new(trust: &'a ForwardedHeaders, headers: &'a HeaderStore) -> Self {
    Self { trust, headers }
  }

  /// Value of the trusted header `name`, if trust is enabled and the header carries a
  /// non-blank value.
  fn trusted(&self, name: &str) -> Option<&'a str> {
    if name.is_empty() {
      return None;
    }
    self.headers
      .header(name)
      .map(str::trim)
      .filter(|value| !value.is_empty())
  }

  /// Request scheme: the trusted protocol header, else `"http"`.
  ///
  /// TLS is never terminated here, so without a trusted header the scheme is always
  /// plain HTTP whatever the client sends.
  pub fn scheme(&self) -> &'a str {
    match self.trusted(&self.trust.forwarded_proto) {
      Some(proto) => proto,
      None => {
        tracing::trace!("no trusted protocol header, using default scheme");
        DEFAULT_SCHEME
      }
    }
  }

  /// Returns `true` when the resolved scheme is `https`, ignoring case.
  pub fn is_secure(&self) -> bool {
    self.scheme().eq_ignore_ascii_case("https")
  }

  /// Host name: the trusted host header, else `Host`, else the local socket address.
  ///
  /// Any port in the header value is dropped; the port is reported separately.
  pub fn host(&self, local_addr: &SocketAddr) -> String {
    let authority = self.trusted(&self.trust.forwarded_host).or_else(|| {
      tracing::trace!("no trusted host header, falling back to Host");
      self.headers
        .header(http::header::HOST.as_str())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    });

    match authority {
      Some(authority) => strip_port(authority).to_string(),
      None => {
        tracing::trace!("no Host header, using local address");
        host_string(local_addr)
      }
    }
  }

  /// Client address: the first entry of the trusted "for" header, else the remote
  /// socket address.
  ///
  /// A forwarding chain reads `client, proxy1, proxy2`; the first entry is the
  /// original client.
  pub fn client_addr(&self, remote_addr: &SocketAddr) -> String {
    let forwarded = self
      .trusted(&self.trust.forwarded_for)
      .and_then(|value| value.split(',').next())
      .map(str::trim)
      .filter(|client| !client.is_empty());

    match forwarded {
      Some(client) => client.to_string(),
      None => {
        tracing::trace!("no trusted client header, using remote address");
        host_string(remote_addr)
      }
    }
  }
}

/// Textual host of a socket address, without brackets or port. No DNS lookup is made.
pub fn host_string(addr: &SocketAddr) -> String {
  addr.ip().to_string()
}

/// Drops a trailing `:port` from an authority, keeping bracketed IPv6 literals intact.
fn strip_port(authority: &str) -> &str {
  if authority.starts_with('[') {
    return match authority.find(']') {
      Some(end) => &authority[..=end],
      None => authority,
    };
  }

  match authority.rfind(':') {
    // A single colon separates host and port; more than one is a bare IPv6 literal.
    Some(colon) if authority.matches(':').count() == 1 => &authority[..colon],
    _ => authority,
  }
}
