use crate::settings::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, str::FromStr, time::Duration};
use tracing::debug;

pub const ENV_CONSUMER_THREADS: &str = "MIGRATION_CONSUMER_THREADS";
pub const ENV_QUEUE_CAPACITY: &str = "MIGRATION_QUEUE_CAPACITY";
pub const ENV_BATCH_SIZE: &str = "MIGRATION_BATCH_SIZE";
pub const ENV_MAX_RETRIES: &str = "MIGRATION_MAX_RETRIES";
pub const ENV_RETRY_DELAY_MS: &str = "MIGRATION_RETRY_DELAY_MS";
pub const ENV_SOURCE_FETCH_SIZE: &str = "MIGRATION_SOURCE_FETCH_SIZE";
pub const ENV_TARGET_POOL_SIZE: &str = "MIGRATION_TARGET_POOL_SIZE";

/// Immutable, validated tunables used throughout a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Consumers per collection sharing one queue
    pub consumer_threads: usize,
    /// Batches the queue holds before the producer blocks
    pub queue_capacity: usize,
    /// Documents per batch
    pub batch_size: usize,
    /// Write attempts per batch before it is dropped
    pub max_retries: usize,
    /// Backoff unit; attempt n waits `retry_delay_ms * n`
    pub retry_delay_ms: u64,
    /// Documents pulled from the source cursor per round trip
    pub source_fetch_size: usize,
    /// Target connections shared by all consumers of a run
    pub target_pool_size: usize,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            consumer_threads: 4,
            queue_capacity: 10_000,
            batch_size: 1000,
            max_retries: 3,
            retry_delay_ms: 1000,
            source_fetch_size: 5000,
            target_pool_size: 10,
        }
    }
}

impl MigrationSettings {
    pub fn builder() -> MigrationSettingsBuilder {
        MigrationSettingsBuilder::default()
    }

    pub fn from_builder(builder: MigrationSettingsBuilder) -> Self {
        let defaults = Self::default();
        Self {
            consumer_threads: builder.consumer_threads.unwrap_or(defaults.consumer_threads),
            queue_capacity: builder.queue_capacity.unwrap_or(defaults.queue_capacity),
            batch_size: builder.batch_size.unwrap_or(defaults.batch_size),
            max_retries: builder.max_retries.unwrap_or(defaults.max_retries),
            retry_delay_ms: builder.retry_delay_ms.unwrap_or(defaults.retry_delay_ms),
            source_fetch_size: builder
                .source_fetch_size
                .unwrap_or(defaults.source_fetch_size),
            target_pool_size: builder.target_pool_size.unwrap_or(defaults.target_pool_size),
        }
    }

    /// Reads a JSON settings file; absent keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Overrides every tunable present in `vars` (`MIGRATION_*` keys).
    pub fn with_env_overrides(self, vars: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let env = MigrationSettingsBuilder::from_env(vars)?;
        let merged = Self {
            consumer_threads: env.consumer_threads.unwrap_or(self.consumer_threads),
            queue_capacity: env.queue_capacity.unwrap_or(self.queue_capacity),
            batch_size: env.batch_size.unwrap_or(self.batch_size),
            max_retries: env.max_retries.unwrap_or(self.max_retries),
            retry_delay_ms: env.retry_delay_ms.unwrap_or(self.retry_delay_ms),
            source_fetch_size: env.source_fetch_size.unwrap_or(self.source_fetch_size),
            target_pool_size: env.target_pool_size.unwrap_or(self.target_pool_size),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let checks: [(&str, u64); 6] = [
            ("consumer_threads", self.consumer_threads as u64),
            ("queue_capacity", self.queue_capacity as u64),
            ("batch_size", self.batch_size as u64),
            ("max_retries", self.max_retries as u64),
            ("source_fetch_size", self.source_fetch_size as u64),
            ("target_pool_size", self.target_pool_size as u64),
        ];
        match checks.iter().find(|(_, v)| *v == 0) {
            Some((key, _)) => Err(SettingsError::Invalid {
                key: key.to_string(),
                reason: "must be at least 1".into(),
            }),
            None => Ok(()),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Default)]
pub struct MigrationSettingsBuilder {
    pub consumer_threads: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub batch_size: Option<usize>,
    pub max_retries: Option<usize>,
    pub retry_delay_ms: Option<u64>,
    pub source_fetch_size: Option<usize>,
    pub target_pool_size: Option<usize>,
}

impl MigrationSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks up every `MIGRATION_*` tunable present in `vars`.
    pub fn from_env(vars: &HashMap<String, String>) -> Result<Self, SettingsError> {
        Ok(Self {
            consumer_threads: parse_var(vars, ENV_CONSUMER_THREADS)?,
            queue_capacity: parse_var(vars, ENV_QUEUE_CAPACITY)?,
            batch_size: parse_var(vars, ENV_BATCH_SIZE)?,
            max_retries: parse_var(vars, ENV_MAX_RETRIES)?,
            retry_delay_ms: parse_var(vars, ENV_RETRY_DELAY_MS)?,
            source_fetch_size: parse_var(vars, ENV_SOURCE_FETCH_SIZE)?,
            target_pool_size: parse_var(vars, ENV_TARGET_POOL_SIZE)?,
        })
    }

    pub fn consumer_threads(mut self, consumer_threads: usize) -> Self {
        self.consumer_threads = Some(consumer_threads);
        self
    }

    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = Some(queue_capacity);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = Some(retry_delay_ms);
        self
    }

    pub fn source_fetch_size(mut self, source_fetch_size: usize) -> Self {
        self.source_fetch_size = Some(source_fetch_size);
        self
    }

    pub fn target_pool_size(mut self, target_pool_size: usize) -> Self {
        self.target_pool_size = Some(target_pool_size);
        self
    }

    pub fn build(self) -> Result<MigrationSettings, SettingsError> {
        let settings = MigrationSettings::from_builder(self);
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_var<T: FromStr>(vars: &HashMap<String, String>, key: &str) -> Result<Option<T>, SettingsError>
where
    T::Err: std::fmt::Display,
{
    match vars.get(key) {
        None => Ok(None),
        Some(raw) => {
            let value = raw.trim().parse::<T>().map_err(|e| SettingsError::Invalid {
                key: key.to_string(),
                reason: format!("{raw:?}: {e}"),
            })?;
            debug!(key, value = raw.trim(), "Setting overridden from environment");
            Ok(Some(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = MigrationSettings::default();
        assert_eq!(settings.consumer_threads, 4);
        assert_eq!(settings.queue_capacity, 10_000);
        assert_eq!(settings.batch_size, 1000);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.retry_delay(), Duration::from_secs(1));
        assert_eq!(settings.source_fetch_size, 5000);
        assert_eq!(settings.target_pool_size, 10);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let settings = MigrationSettings::builder()
            .batch_size(500)
            .consumer_threads(8)
            .build()
            .unwrap();

        assert_eq!(settings.batch_size, 500);
        assert_eq!(settings.consumer_threads, 8);
        assert_eq!(settings.queue_capacity, 10_000);
    }

    #[test]
    fn test_zero_is_rejected() {
        let err = MigrationSettings::builder().max_retries(0).build().unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { ref key, .. } if key == "max_retries"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"batch_size": 200, "consumer_threads": 2}}"#).unwrap();
        let from_file = MigrationSettings::from_json_file(file.path()).unwrap();
        assert_eq!(from_file.batch_size, 200);
        assert_eq!(from_file.max_retries, 3);

        let vars = HashMap::from([
            (ENV_CONSUMER_THREADS.to_string(), "6".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ]);
        let merged = from_file.with_env_overrides(&vars).unwrap();
        assert_eq!(merged.batch_size, 200);
        assert_eq!(merged.consumer_threads, 6);
    }

    #[test]
    fn test_unparseable_env_value() {
        let vars = HashMap::from([(ENV_BATCH_SIZE.to_string(), "lots".to_string())]);
        let err = MigrationSettingsBuilder::from_env(&vars).unwrap_err();
        assert!(err.to_string().contains(ENV_BATCH_SIZE));
    }
}
