use crate::error::CliError;
use std::{collections::HashMap, fs, path::Path};
use tracing::debug;

const SENSITIVE_PATTERNS: &[&str] = &["password", "passwd", "secret", "token", "credential"];

/// Process environment plus any `.env` files loaded on top of it.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Load variables from a .env file; file entries win over the process env.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        for (key, value) in parse_env_content(&content)? {
            let shown = if is_sensitive(&key) { "***" } else { value.as_str() };
            debug!(key = %key, value = %shown, "Loaded env entry");
            self.vars.insert(key, value);
        }
        Ok(())
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.vars
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| key.contains(p))
}

fn parse_env_content(content: &str) -> Result<Vec<(String, String)>, CliError> {
    let mut entries = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid env file: malformed line {} (expected KEY=VALUE)",
                line_num + 1
            )));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Config(format!(
                "Invalid env file: empty key at line {}",
                line_num + 1
            )));
        }

        entries.push((key.to_string(), unquote(value.trim()).to_string()));
    }

    Ok(entries)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
