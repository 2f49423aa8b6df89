//! Plugin configuration and normalization.
//!
//! The host orchestrator validates configuration against a schema and hands
//! this crate a plain object. [`RawConfig`] is that object's shape (every
//! field optional); [`PluginConfig::normalize`] applies the documented
//! defaults and rejects values the schema cannot catch, yielding the
//! fully-populated configuration the pipeline runs on.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts;

/// Target CPU architecture for the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
  #[default]
  Aarch64,
  X64,
}

impl Architecture {
  /// The spelling used in configuration and download URLs.
  pub fn as_str(self) -> &'static str {
    match self {
      Architecture::Aarch64 => "aarch64",
      Architecture::X64 => "x64",
    }
  }

  /// The architecture identifier Lambda uses for functions and layers.
  pub fn lambda_identifier(self) -> &'static str {
    match self {
      Architecture::Aarch64 => "arm64",
      Architecture::X64 => "x86_64",
    }
  }
}

/// Raw plugin configuration as accepted by the orchestrator's schema.
///
/// All fields are optional; defaults are applied by
/// [`PluginConfig::normalize`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
  pub architecture: Option<Architecture>,
  pub release: Option<String>,
  #[serde(rename = "sourceURL")]
  pub source_url: Option<String>,
  pub output_path: Option<PathBuf>,
  pub is_public: Option<bool>,
  pub layer_key: Option<String>,
  pub omit_injection: Option<bool>,
}

/// Errors produced by configuration normalization.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// `release` was given but blank.
  #[error("release must not be blank; omit it to use '{}'", consts::DEFAULT_RELEASE)]
  BlankRelease,

  /// `sourceURL` was given but blank.
  #[error("sourceURL must not be blank; omit it to use the official download endpoint")]
  BlankSourceUrl,

  /// `outputPath` was given but blank.
  #[error("outputPath must not be blank; omit it to use '{}'", consts::DEFAULT_OUTPUT_PATH)]
  BlankOutputPath,

  /// `layerKey` was given but blank.
  #[error("layerKey must not be blank; omit it to use '{}'", consts::DEFAULT_LAYER_KEY)]
  BlankLayerKey,
}

/// Fully-populated plugin configuration.
#[derive(Debug, Clone)]
pub struct PluginConfig {
  pub architecture: Architecture,
  pub release: String,
  pub source_url: Option<String>,
  pub output_path: PathBuf,
  pub is_public: bool,
  pub layer_key: String,
  pub omit_injection: bool,
}

impl PluginConfig {
  /// Apply defaults to a raw configuration and validate what remains.
  ///
  /// Absent fields take their documented defaults. A field that is present
  /// but blank is rejected rather than silently defaulted.
  pub fn normalize(raw: RawConfig) -> Result<Self, ConfigError> {
    let release = match raw.release {
      Some(release) if release.trim().is_empty() => return Err(ConfigError::BlankRelease),
      Some(release) => release,
      None => consts::DEFAULT_RELEASE.to_string(),
    };

    let source_url = match raw.source_url {
      Some(url) if url.trim().is_empty() => return Err(ConfigError::BlankSourceUrl),
      other => other,
    };

    let output_path = match raw.output_path {
      Some(path) if path.as_os_str().is_empty() => return Err(ConfigError::BlankOutputPath),
      Some(path) => path,
      None => PathBuf::from(consts::DEFAULT_OUTPUT_PATH),
    };

    let layer_key = match raw.layer_key {
      Some(key) if key.trim().is_empty() => return Err(ConfigError::BlankLayerKey),
      Some(key) => key,
      None => consts::DEFAULT_LAYER_KEY.to_string(),
    };

    Ok(Self {
      architecture: raw.architecture.unwrap_or_default(),
      release,
      source_url,
      output_path,
      is_public: raw.is_public.unwrap_or(false),
      layer_key,
      omit_injection: raw.omit_injection.unwrap_or(false),
    })
  }
}
