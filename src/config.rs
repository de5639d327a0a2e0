use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::Utc;

pub const DEFAULT_ENDPOINT: &str = "https://api.beatsaver.com";

/// Everything the harvester needs, resolved up front by the caller and handed
/// to each component at construction.
#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    /// Base URL of the feed API.
    pub endpoint: String,
    /// Root of the per-map output tree.
    pub output_dir: Utf8PathBuf,
    /// Initial cursor: only maps published before this timestamp are walked.
    pub before: String,
    /// Stop after roughly this many new downloads; unbounded when `None`.
    pub n_maps: Option<u64>,
    /// Pause between page requests.
    pub delay: Duration,
}

impl HarvesterConfig {
    pub fn new(output_dir: Utf8PathBuf) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            output_dir,
            before: default_before(),
            n_maps: None,
            delay: Duration::ZERO,
        }
    }

    /// Effective download bound. The loop's stop check is a strict
    /// greater-than performed after incrementing, so a bound of `n` admits
    /// exactly `n + 1` downloads.
    pub fn effective_bound(&self) -> u64 {
        self.n_maps.unwrap_or(u64::MAX)
    }
}

/// Process-start wall-clock time in the feed's timestamp format.
pub fn default_before() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HarvesterConfig::new(Utf8PathBuf::from("data/raw_maps"));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.delay, Duration::ZERO);
        assert_eq!(config.effective_bound(), u64::MAX);
    }

    #[test]
    fn default_before_shape() {
        let before = default_before();
        // e.g. 2023-05-04T12:00:00.000Z
        assert_eq!(before.len(), 24);
        assert!(before.ends_with('Z'));
        assert_eq!(&before[10..11], "T");
    }
}
