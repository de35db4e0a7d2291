//! Engine-wide settings threaded through validators and resolvers.

use crate::logging::LogConfig;
use std::time::Duration;

/// Configuration shared by every validation of a run.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use term_quality::config::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_metric_timeout(Duration::from_secs(30))
///     .with_batch_metrics(false);
/// assert_eq!(config.metric_timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound for a single backend metric request. `None` waits forever.
    pub metric_timeout: Option<Duration>,
    /// Whether static metrics are requested in one batched backend call. The
    /// SQL backend folds batched aggregates into a single query.
    pub batch_metrics: bool,
    /// Logging verbosity.
    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metric_timeout: None,
            batch_metrics: true,
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_metric_timeout(mut self, timeout: Duration) -> Self {
        self.metric_timeout = Some(timeout);
        self
    }

    pub fn with_batch_metrics(mut self, enabled: bool) -> Self {
        self.batch_metrics = enabled;
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}
