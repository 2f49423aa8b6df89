//! Plugin surface for the host orchestrator.
//!
//! The orchestrator owns hook dispatch; this module only declares which
//! lifecycle events the plugin wants, in what order, and supplies the two
//! callback bodies. Build always runs before injection on the packaging
//! event so injection observes a builder-produced artifact.

use crate::build::{BuildConfig, BuildError, BuildOutcome, LayerBuilder};
use crate::config::{ConfigError, PluginConfig, RawConfig};
use crate::inject::{InjectConfig, inject};
use crate::manifest::ServiceManifest;

/// Orchestrator event the layer is built and injected on.
pub const PACKAGE_EVENT: &str = "before:package:createDeploymentArtifacts";

/// Orchestrator event for the standalone build-only command.
pub const BUILD_EVENT: &str = "bun:build";

/// What a hook binding does when invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
  BuildLayer,
  InjectLayer,
}

/// A lifecycle event paired with the action to run on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hook {
  pub event: &'static str,
  pub action: HookAction,
}

/// The Bun layer plugin: normalized configuration plus the two callbacks
/// the orchestrator invokes through [`Hook`] bindings.
pub struct BunLayerPlugin {
  config: PluginConfig,
}

impl BunLayerPlugin {
  /// Create the plugin from the raw configuration object the orchestrator
  /// validated against the schema.
  pub fn new(raw: RawConfig) -> Result<Self, ConfigError> {
    Ok(Self {
      config: PluginConfig::normalize(raw)?,
    })
  }

  pub fn config(&self) -> &PluginConfig {
    &self.config
  }

  /// The ordered hook bindings to register with the orchestrator.
  ///
  /// Injection is bound after the build on the packaging event, and not
  /// bound at all when `omitInjection` is set.
  pub fn hooks(&self) -> Vec<Hook> {
    let mut hooks = vec![Hook {
      event: PACKAGE_EVENT,
      action: HookAction::BuildLayer,
    }];
    if !self.config.omit_injection {
      hooks.push(Hook {
        event: PACKAGE_EVENT,
        action: HookAction::InjectLayer,
      });
    }
    hooks.push(Hook {
      event: BUILD_EVENT,
      action: HookAction::BuildLayer,
    });
    hooks
  }

  /// Build (or revalidate) the layer archive.
  pub async fn build(&self) -> Result<BuildOutcome, BuildError> {
    LayerBuilder::new(BuildConfig::from(&self.config)).build().await
  }

  /// Register the layer in the manifest and attach it to compatible
  /// functions. Must run after a successful [`build`](Self::build).
  pub fn inject(&self, manifest: &mut ServiceManifest) {
    inject(manifest, &InjectConfig::from(&self.config));
  }
}
