//! Configuration file support for embed sessions.
//!
//! An embedding host may ship a `stowage.toml` next to the project it
//! embeds. The file controls how the payload is stored and how bodies are
//! reduced before storage; absence of the file means defaults throughout.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::container::PayloadEncoding;
use crate::normalize::NormalizeLevel;

/// Conventional config file name, resolved relative to the embedded project.
pub const CONFIG_FILE_NAME: &str = "stowage.toml";

/// Embed-session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Embedding settings
    pub embedding: EmbeddingSettings,
}

/// Settings for how a library's sources are embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// How the payload is stored in metadata.
    pub encoding: PayloadEncoding,

    /// Whitespace reduction applied to bodies before storage.
    pub minify: NormalizeLevel,

    /// Override for the library name used as the unit id prefix.
    /// Defaults to the embedding assembly's own name.
    pub library_name: Option<String>,

    /// Attribute names whose bracketed lines are dropped from bodies
    /// before normalization (e.g. build-server-only annotations).
    pub exclude_attributes: Vec<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        EmbeddingSettings {
            encoding: PayloadEncoding::GzipBase32768,
            minify: NormalizeLevel::Default,
            library_name: None,
            exclude_attributes: Vec::new(),
        }
    }
}

impl EmbedConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read embed config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse embed config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load embed config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
        }

        let contents =
            toml::to_string_pretty(self).context("failed to serialize embed config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write embed config: {}", path.display()))?;

        Ok(())
    }
}
