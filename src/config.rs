//! Server configuration consumed by the request layer.
//!
//! The configuration is an immutable value built once at startup and shared by every
//! request as `Arc<ServerConfig>`. It can be deserialized as part of a larger application
//! config or read from `TAKO_`-prefixed environment variables:
//!
//! | variable                 | field                             | default |
//! |--------------------------|-----------------------------------|---------|
//! | `TAKO_REQUEST_ENCODING`  | `request_encoding`                | `UTF-8` |
//! | `TAKO_DEFAULT_LOCALE`    | `default_locale`                  | `en-US` |
//! | `TAKO_FORWARDED_PROTO`   | `forwarded_headers.forwarded_proto` | empty |
//! | `TAKO_FORWARDED_HOST`    | `forwarded_headers.forwarded_host`  | empty |
//! | `TAKO_FORWARDED_FOR`     | `forwarded_headers.forwarded_for`   | empty |
//!
//! An empty forwarded header name disables trust for that value. See
//! [`forwarded`](crate::forwarded) before enabling any of them.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{charset::Charset, locale::Locale};

/// Environment variable prefix used by [`ServerConfig::from_env`].
pub const ENV_PREFIX: &str = "TAKO_";

/// Header names trusted for scheme, host and client address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ForwardedHeaders {
  /// Header carrying the original scheme, e.g. `X-Forwarded-Proto`.
  pub forwarded_proto: String,
  /// Header carrying the original host, e.g. `X-Forwarded-Host`.
  pub forwarded_host: String,
  /// Header carrying the client address chain, e.g. `X-Forwarded-For`.
  pub forwarded_for: String,
}

impl ForwardedHeaders {
  /// Returns `true` if any header is trusted.
  pub fn any_trusted(&self) -> bool {
    !(self.forwarded_proto.is_empty()
      && self.forwarded_host.is_empty()
      && self.forwarded_for.is_empty())
  }
}

/// Request-related server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  /// Encoding applied to bodies and parameters until a handler overrides it.
  pub request_encoding: Charset,
  /// Locale reported when a request carries no usable `Accept-Language`.
  pub default_locale: Locale,
  pub forwarded_headers: ForwardedHeaders,
}

/// Flat shape of [`ServerConfig`] for environment variables.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvConfig {
  request_encoding: Charset,
  default_locale: Locale,
  forwarded_proto: String,
  forwarded_host: String,
  forwarded_for: String,
}

impl From<EnvConfig> for ServerConfig {
  fn from(env: EnvConfig) -> Self {
    Self {
      request_encoding: env.request_encoding,
      default_locale: env.default_locale,
      forwarded_headers: ForwardedHeaders {
        forwarded_proto: env.forwarded_proto,
        forwarded_host: env.forwarded_host,
        forwarded_for: env.forwarded_for,
      },
    }
  }
}

impl ServerConfig {
  /// Reads the configuration from the process environment.
  pub fn from_env() -> Result<Self> {
    let env = envy::prefixed(ENV_PREFIX)
      .from_env::<EnvConfig>()
      .context("failed to read server config from environment")?;
    Ok(Self::from(env).logged())
  }

  /// Reads the configuration from explicit `(name, value)` variables.
  pub fn from_vars<I>(vars: I) -> Result<Self>
  where
    I: IntoIterator<Item = (String, String)>,
  {
    let env = envy::prefixed(ENV_PREFIX)
      .from_iter::<_, EnvConfig>(vars)
      .context("failed to read server config from variables")?;
    Ok(Self::from(env).logged())
  }

  pub fn forwarded_headers(&self) -> &ForwardedHeaders {
    &self.forwarded_headers
  }

  pub fn with_forwarded_headers(mut self, forwarded_headers: ForwardedHeaders) -> Self {
    self.forwarded_headers = forwarded_headers;
    self
  }

  fn logged(self) -> Self {
    if self.forwarded_headers.any_trusted() {
      tracing::info!(
        proto = %self.forwarded_headers.forwarded_proto,
        host = %self.forwarded_headers.forwarded_host,
        client = %self.forwarded_headers.forwarded_for,
        "forwarded header trust enabled"
      );
    }
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn defaults() {
    let config = ServerConfig::from_vars(Vec::new()).unwrap();
    assert_eq!(config.request_encoding, Charset::Utf8);
    assert_eq!(config.default_locale.to_string(), "en-US");
    assert!(!config.forwarded_headers.any_trusted());
    assert_eq!(config, ServerConfig::default());
  }

  #[test]
  fn reads_prefixed_variables() {
    let config = ServerConfig::from_vars(vars(&[
      ("TAKO_REQUEST_ENCODING", "iso-8859-1"),
      ("TAKO_DEFAULT_LOCALE", "de-DE"),
      ("TAKO_FORWARDED_PROTO", "X-Forwarded-Proto"),
      ("TAKO_FORWARDED_FOR", "X-Forwarded-For"),
      ("OTHER_FORWARDED_HOST", "ignored"),
    ]))
    .unwrap();

    assert_eq!(config.request_encoding, Charset::Latin1);
    assert_eq!(config.default_locale, Locale::new("de", Some("DE")));
    assert_eq!(config.forwarded_headers.forwarded_proto, "X-Forwarded-Proto");
    assert_eq!(config.forwarded_headers.forwarded_host, "");
    assert_eq!(config.forwarded_headers.forwarded_for, "X-Forwarded-For");
  }

  #[test]
  fn rejects_unknown_encoding() {
    let err = ServerConfig::from_vars(vars(&[("TAKO_REQUEST_ENCODING", "ebcdic")]));
    assert!(err.is_err());
  }
}
