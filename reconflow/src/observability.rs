//! Process-level tracing setup.
//!
//! The library only emits `tracing` events. Embedders that do not install
//! their own subscriber can call [`init_tracing`] once at startup.

use tracing_subscriber::EnvFilter;

/// Installs a formatted `tracing` subscriber for the process.
///
/// The filter comes from `RUST_LOG` when set, falling back to
/// `default_filter`, then to `info`. Calling this when a subscriber is
/// already installed keeps the existing one.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_tolerates_repeat_calls() {
        init_tracing("debug");
        init_tracing("reconflow=trace");
    }
}
