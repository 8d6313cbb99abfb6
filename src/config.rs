//! Engine configuration.

use serde::Deserialize;
use std::path::Path;

/// Tunables for scanning, probing, repair and transfer.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// jpeg_quality = 90
/// progress_interval = 256
/// trash_dir_patterns = [".Trash", "Deleted Items"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quality used when re-encoding damaged images.
    pub jpeg_quality: u8,
    /// Appended to the base name of every repaired artifact.
    pub repaired_suffix: String,
    /// Appended to the final name while an artifact is still being written.
    pub partial_suffix: String,
    /// Buffer size for streaming copies and digest passes.
    pub copy_buffer_size: usize,
    /// Upper bound for the bounded-read probes.
    pub probe_read_bytes: usize,
    /// Emit a progress snapshot every this many records.
    pub progress_interval: u64,
    /// Directory-name prefixes (case-insensitive) that mark a tree entry as trashed.
    pub trash_dir_patterns: Vec<String>,
    /// File-name prefix a platform uses for trashed files.
    pub trashed_file_prefix: String,
    /// Names never emitted by a scan (case-insensitive).
    pub rejected_names: Vec<String>,
    /// Mime prefixes never emitted by a scan.
    pub rejected_mime_prefixes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 95,
            repaired_suffix: "_fixed".to_string(),
            partial_suffix: ".part".to_string(),
            copy_buffer_size: 64 * 1024,
            probe_read_bytes: 1024,
            progress_interval: 64,
            trash_dir_patterns: vec![
                ".trash".to_string(),
                "$recycle.bin".to_string(),
                ".recycle".to_string(),
                "recently deleted".to_string(),
            ],
            trashed_file_prefix: ".trashed-".to_string(),
            rejected_names: vec![
                ".nomedia".to_string(),
                ".ds_store".to_string(),
                "thumbs.db".to_string(),
                "desktop.ini".to_string(),
            ],
            rejected_mime_prefixes: vec![
                "inode/".to_string(),
                "vnd.android.document/directory".to_string(),
            ],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality must be 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.partial_suffix.is_empty() {
            return Err(ConfigError::Invalid("partial_suffix must not be empty".into()));
        }
        if self.copy_buffer_size == 0 || self.progress_interval == 0 {
            return Err(ConfigError::Invalid(
                "copy_buffer_size and progress_interval must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn with_repaired_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.repaired_suffix = suffix.into();
        self
    }

    /// Name an artifact carries while it is still being written.
    pub fn partial_name(&self, final_name: &str) -> String {
        format!("{final_name}{}", self.partial_suffix)
    }

    /// `<base><suffix>.<ext>` for a repaired artifact.
    pub fn repaired_name(&self, base: &str, ext: &str) -> String {
        format!("{base}{}.{ext}", self.repaired_suffix)
    }
}
