use engine_config::settings::validated::MigrationSettings;

/// Configuration for producer behavior.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Documents per batch handed to the queue
    pub batch_size: usize,

    /// Documents pulled from the source cursor per round trip
    pub fetch_size: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self::from_settings(&MigrationSettings::default())
    }
}

impl ProducerConfig {
    pub fn from_settings(settings: &MigrationSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            fetch_size: settings.source_fetch_size,
        }
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_fetch_size(mut self, size: usize) -> Self {
        self.fetch_size = size;
        self
    }
}
