//! Tracing subscriber bootstrap (feature `tracing-init`).
//!
//! This module is deliberately small: the scheduler and resolver instrument
//! their own spans with `tracing::instrument`, and emit `debug!`/`warn!` on
//! cache misses and fallback resolution. All this module does is wire up a
//! reasonable default subscriber for binaries that embed this crate and
//! don't want to configure `tracing-subscriber` themselves.

#[cfg(feature = "tracing-init")]
use tracing_subscriber::{EnvFilter, fmt};

/// Install a default `tracing-subscriber` that reads its filter from
/// `RUST_LOG`, falling back to `info` when unset.
///
/// Idempotent: a second call after one has already installed a global
/// subscriber is a silent no-op (mirrors `tracing::subscriber::set_global_default`'s
/// own `Err` being ignored here, since re-initialization is not an error
/// condition for embedders that call this defensively).
#[cfg(feature = "tracing-init")]
pub fn init_default_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
