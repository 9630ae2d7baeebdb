use engine_config::settings::validated::MigrationSettings;
use engine_core::retry::RetryPolicy;
use std::time::Duration;

/// Configuration for consumer behavior.
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    /// Write attempts per batch before it is dropped
    pub max_retries: usize,

    /// Backoff unit between attempts
    pub retry_delay: Duration,

    /// Every n-th batch a consumer finishes is logged at debug level
    pub log_every: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self::from_settings(&MigrationSettings::default())
    }
}

impl ConsumerConfig {
    pub fn from_settings(settings: &MigrationSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay(),
            log_every: 10,
        }
    }

    pub fn with_retries(mut self, max_retries: usize, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }
}
