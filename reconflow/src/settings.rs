//! Process-wide settings.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Knobs shared by every pipeline in the process.
///
/// Deserializable from configuration files; every field falls back to a
/// default when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSettings {
    /// Directory intermediate pipeline directories are created under.
    #[serde(default = "default_intermediate_root")]
    pub intermediate_root: PathBuf,

    /// Concurrency hint injected into every stage configuration.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Poll cadence of the scheduler loop, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_intermediate_root() -> PathBuf {
    std::env::temp_dir().join("reconflow")
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            intermediate_root: default_intermediate_root(),
            worker_threads: default_worker_threads(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ProcessSettings {
    /// The poll cadence as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ProcessSettings::default();
        assert!(settings.worker_threads >= 1);
        assert_eq!(settings.poll_interval_ms, 500);
        assert!(settings.intermediate_root.ends_with("reconflow"));
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let settings: ProcessSettings =
            serde_json::from_str(r#"{"worker_threads": 3}"#).unwrap();
        assert_eq!(settings.worker_threads, 3);
        assert_eq!(settings.poll_interval_ms, 500);
    }

    #[test]
    fn test_poll_interval_conversion() {
        let settings: ProcessSettings =
            serde_json::from_str(r#"{"poll_interval_ms": 50}"#).unwrap();
        assert_eq!(settings.poll_interval(), Duration::from_millis(50));
    }
}
