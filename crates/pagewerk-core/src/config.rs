// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PagewerkError, Result};

/// Tunables for the whole engine. Missing fields in a config file fall back
/// to [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Compression pipeline settings.
    pub compression: CompressionConfig,
    /// Credential recovery settings.
    pub credentials: CredentialConfig,
    /// Maximum number of source documents accepted by a single merge.
    pub max_merge_sources: usize,
}

/// Compression pipeline constants. These are empirical; keep them
/// configurable rather than baking them into the strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// A strategy is accepted only when its size reduction exceeds this
    /// percentage.
    pub min_gain_percent: f64,
    /// Page scale used by the structural rewrite at `high`.
    pub structural_scale: f32,
    /// Page scale used by the metadata strip at `high`.
    pub metadata_scale: f32,
    /// Page scale used by the content-stream recompression at `high`.
    pub content_stream_scale: f32,
    /// Name or path of the external optimizer (Ghostscript).
    pub optimizer_binary: String,
    /// Set to false to never shell out.
    pub optimizer_enabled: bool,
}

/// Credential recovery settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Tried before the built-in dictionary, in order.
    pub extra_passwords: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compression: CompressionConfig::default(),
            credentials: CredentialConfig::default(),
            max_merge_sources: 10,
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_gain_percent: 5.0,
            structural_scale: 0.90,
            metadata_scale: 0.95,
            content_stream_scale: 0.85,
            optimizer_binary: "gs".to_owned(),
            optimizer_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                PagewerkError::SourceNotFound(path.display().to_string())
            } else {
                PagewerkError::Io(err)
            }
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.compression;
        if !(0.0..=100.0).contains(&c.min_gain_percent) {
            return Err(PagewerkError::InvalidConfig(format!(
                "min_gain_percent must be within 0..=100, got {}",
                c.min_gain_percent
            )));
        }
        for (name, scale) in [
            ("structural_scale", c.structural_scale),
            ("metadata_scale", c.metadata_scale),
            ("content_stream_scale", c.content_stream_scale),
        ] {
            if !(scale > 0.0 && scale <= 1.0) {
                return Err(PagewerkError::InvalidConfig(format!(
                    "{name} must be within (0, 1], got {scale}"
                )));
            }
        }
        if self.max_merge_sources < 2 {
            return Err(PagewerkError::InvalidConfig(format!(
                "max_merge_sources must allow at least two documents, got {}",
                self.max_merge_sources
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.compression.min_gain_percent, 5.0);
        assert_eq!(config.max_merge_sources, 10);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"compression": {"optimizer_enabled": false}}"#)
                .expect("valid config");
        assert!(!config.compression.optimizer_enabled);
        assert_eq!(config.compression.structural_scale, 0.90);
        assert!(config.credentials.extra_passwords.is_empty());
    }

    #[test]
    fn rejects_out_of_range_scale() {
        let err = EngineConfig::from_json_str(r#"{"compression": {"metadata_scale": 1.5}}"#)
            .unwrap_err();
        assert!(matches!(err, PagewerkError::InvalidConfig(_)));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = EngineConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PagewerkError::SourceNotFound(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pagewerk.json");
        std::fs::write(&path, r#"{"credentials": {"extra_passwords": ["hunter2"]}}"#)
            .expect("write");
        let config = EngineConfig::load(&path).expect("load");
        assert_eq!(config.credentials.extra_passwords, vec!["hunter2".to_owned()]);
    }
}
