//! Layer Injector: registers the built archive in a service manifest and
//! attaches it to every compatible function.
//!
//! Injection is pure manifest mutation: it raises no errors under
//! well-formed input and never touches a function it skips. A function is
//! compatible when its effective runtime (function-level override, else
//! provider default) is one of the custom-runtime spellings AND its
//! effective architecture matches the layer's. Both dimensions must match;
//! a function with either dimension unresolved is skipped because
//! compatibility cannot be determined.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::{Architecture, PluginConfig};
use crate::consts;
use crate::manifest::{LayerDefinition, LayerPackage, LayerRef, ServiceManifest};

/// Parameters for one injection run.
#[derive(Debug, Clone)]
pub struct InjectConfig {
  pub architecture: Architecture,
  pub output_path: PathBuf,
  pub layer_key: String,
  pub is_public: bool,
}

impl From<&PluginConfig> for InjectConfig {
  fn from(config: &PluginConfig) -> Self {
    Self {
      architecture: config.architecture,
      output_path: config.output_path.clone(),
      layer_key: config.layer_key.clone(),
      is_public: config.is_public,
    }
  }
}

/// Register the layer in the manifest and attach it to compatible functions.
///
/// The layer entry is inserted (or overwritten) under `layer_key`; each
/// compatible function gets a `{ Ref: ... }` pointer appended to its
/// existing `layers` sequence, in declaration order, preserving whatever
/// layers were already there.
pub fn inject(manifest: &mut ServiceManifest, config: &InjectConfig) {
  info!(layer = %config.layer_key, "registering bun layer in service manifest");

  let definition = LayerDefinition {
    package: LayerPackage {
      artifact: config.output_path.display().to_string(),
    },
    name: format!("{}-{}", manifest.service, config.layer_key),
    description: consts::LAYER_DESCRIPTION.to_string(),
    compatible_runtimes: consts::COMPATIBLE_RUNTIMES.iter().map(|s| s.to_string()).collect(),
    compatible_architectures: vec![config.architecture.lambda_identifier().to_string()],
    license_info: consts::LAYER_LICENSE.to_string(),
    allowed_accounts: config.is_public.then(|| vec!["*".to_string()]),
  };
  manifest.layers.insert(config.layer_key.clone(), definition);

  let reference = LayerRef::Ref {
    logical_id: layer_logical_id(&config.layer_key),
  };
  let compatible_architecture = config.architecture.lambda_identifier();
  let provider_runtime = manifest.provider.runtime.clone();
  let provider_architecture = manifest.provider.architecture.clone();

  let mut attached = 0usize;
  for (name, function) in manifest.functions.iter_mut() {
    if function.omit_layer {
      debug!(function = %name, "function opted out of layer injection");
      continue;
    }

    let Some(runtime) = function.runtime.as_deref().or(provider_runtime.as_deref()) else {
      debug!(function = %name, "no runtime declared, skipping");
      continue;
    };
    let Some(architecture) = function
      .architecture
      .as_deref()
      .or(provider_architecture.as_deref())
    else {
      debug!(function = %name, "no architecture declared, skipping");
      continue;
    };

    let runtime_compatible = consts::COMPATIBLE_RUNTIMES.iter().any(|r| *r == runtime);
    if runtime_compatible && architecture == compatible_architecture {
      function.layers.push(reference.clone());
      attached += 1;
      debug!(function = %name, "attached bun layer");
    }
  }

  info!(layer = %config.layer_key, functions = attached, "layer injection complete");
}

/// Derive the CloudFormation-style logical id a layer key is referenced by:
/// the Pascal-cased key followed by `LambdaLayer` (`bun` → `BunLambdaLayer`,
/// `bun-canary` → `BunCanaryLambdaLayer`).
pub fn layer_logical_id(layer_key: &str) -> String {
  let mut id = String::with_capacity(layer_key.len() + 11);
  let mut upper_next = true;
  for c in layer_key.chars() {
    if c.is_alphanumeric() {
      if upper_next {
        id.extend(c.to_uppercase());
      } else {
        id.push(c);
      }
      upper_next = false;
    } else {
      upper_next = true;
    }
  }
  id.push_str("LambdaLayer");
  id
}
