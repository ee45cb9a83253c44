//! Logging setup with QNTX segment prefixes.
//!
//! Analysis scripts call [`init`] once; notebooks and tests that may
//! initialize repeatedly use [`try_init_with_filter`].

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with QNTX defaults.
///
/// Sets up tracing-subscriber with:
/// - Environment filter (RUST_LOG)
/// - Compact format suitable for terminal output
///
/// Panics if a global subscriber is already installed.
pub fn init() {
    init_with_filter("info");
}

/// Initialize tracing with a custom default filter.
pub fn init_with_filter(default_filter: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().compact())
        .init();
}

/// Like [`init_with_filter`], but returns `false` instead of panicking when a
/// subscriber is already installed.
pub fn try_init_with_filter(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().compact())
        .try_init()
        .is_ok()
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// QNTX segment prefixes for logging.
pub mod prefix {
    /// Dimensionality reduction prefix
    pub const REDUCE: &str = "⋈";
    /// Disk cache prefix
    pub const CACHE: &str = "⊔";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_rejected_quietly() {
        let _ = try_init_with_filter("debug");
        assert!(!try_init_with_filter("debug"));
    }
}
