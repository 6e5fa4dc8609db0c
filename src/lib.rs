//! Request adaptation for the tako HTTP server.
//!
//! A connector hands each parsed exchange to [`Request::new`] as a [`RawExchange`], along
//! with the shared [`ServerConfig`]. The resulting [`Request`] gives handlers read access to
//! the request line, headers, query and form parameters, connection coordinates and
//! negotiated locales, a mutable attribute map, and one-shot access to the body.
//! Capabilities the layer does not provide are listed in [`unsupported`].

pub mod attributes;
pub mod body;
pub mod charset;
pub mod config;
pub mod error;
pub mod exchange;
pub mod forwarded;
pub mod headers;
pub mod locale;
pub mod params;
pub mod request;
pub mod types;
pub mod unsupported;

#[cfg(feature = "tako-tracing")]
pub mod tracing;

pub use config::ServerConfig;
pub use error::RequestError;
pub use exchange::RawExchange;
pub use request::Request;
