//! Log output for the request layer.
//!
//! The layer emits `tracing` events on its own: forwarded-header fallbacks at `TRACE`,
//! request construction and ignored encoding changes at `DEBUG`, body reopen attempts at
//! `WARN` and forwarded-header trust at `INFO` when the config is loaded. Embedding servers
//! normally install their own subscriber; [`init_tracing`] sets up a formatted one for
//! binaries and tests that have none.

use tracing_subscriber::{
  Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

pub use tracing::level_filters::LevelFilter;

/// Installs the global formatted subscriber filtered at `level`.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing(level: LevelFilter) -> bool {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_filter(level),
    )
    .try_init()
    .is_ok()
}
