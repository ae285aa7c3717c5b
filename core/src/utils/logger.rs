use std::sync::Once;

use tracing_forest::ForestLayer;
use tracing_subscriber::{
  fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

static INIT: Once = Once::new();

/// Install a `fmt` subscriber filtered by `RUST_LOG`, `info` when unset.
/// Only the first call has an effect.
pub fn setup_logger() {
  INIT.call_once(|| {
    let env_filter = EnvFilter::builder()
      .with_default_directive(tracing::Level::INFO.into())
      .from_env_lossy();
    let _ = tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_span_events(FmtSpan::CLOSE)
      .with_target(false)
      .try_init();
  });
}

/// Install a `tracing-forest` subscriber that prints spans as a tree with
/// their timings. Filtered by `RUST_TRACER`, `info` when unset.
pub fn setup_tracer() {
  INIT.call_once(|| {
    let env_filter = EnvFilter::builder()
      .with_default_directive(tracing::Level::INFO.into())
      .with_env_var("RUST_TRACER")
      .from_env_lossy();
    let _ = Registry::default()
      .with(env_filter)
      .with(ForestLayer::default())
      .try_init();
  });
}
