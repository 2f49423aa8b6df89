//! Service manifest object model.
//!
//! A minimal serde view of the declarative service description the host
//! orchestrator hands to plugins: the service name, provider-level defaults,
//! declared functions, and the layers map. Only the fields this crate reads
//! or writes are modeled; declaration order of functions and layers is
//! preserved so injection walks functions exactly as declared.
//!
//! # Manifest shape
//!
//! ```yaml
//! service: my-service
//! provider:
//!   runtime: provided.al2
//!   architecture: arm64
//! functions:
//!   api:
//!     handler: src/index.fetch
//!   worker:
//!     image: 000000000000.dkr.ecr.us-east-1.amazonaws.com/worker:latest
//!     omitLayer: true
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The in-memory service manifest mutated by layer injection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceManifest {
  /// Service name, used when generating the layer's display name.
  pub service: String,

  /// Provider-level defaults for runtime and architecture.
  #[serde(default)]
  pub provider: Provider,

  /// Declared functions, in declaration order.
  #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
  pub functions: IndexMap<String, FunctionDefinition>,

  /// Declared layers, keyed by layer key.
  #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
  pub layers: IndexMap<String, LayerDefinition>,
}

/// Provider-level defaults that functions fall back to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provider {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub runtime: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub architecture: Option<String>,
}

/// A declared function.
///
/// The deployment kind (handler-based vs image-based) varies, but the
/// fields injection touches are common to both, so the kind is an opaque
/// variant the injector never inspects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
  #[serde(flatten)]
  pub kind: FunctionKind,

  /// Function-level runtime override.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub runtime: Option<String>,

  /// Function-level architecture override.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub architecture: Option<String>,

  /// Layers already attached to the function.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub layers: Vec<LayerRef>,

  /// Opt-out flag: when set, injection never touches this function.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub omit_layer: bool,
}

/// The two deployment kinds a function can declare.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionKind {
  /// Handler-based function (code uploaded as a package).
  Handler { handler: String },

  /// Image-based function (container image URI).
  Image { image: String },
}

/// A reference inside a function's `layers` sequence: either a literal
/// layer ARN or a named pointer to a layer resource in this manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerRef {
  Arn(String),
  Ref {
    #[serde(rename = "Ref")]
    logical_id: String,
  },
}

/// A layer entry in the manifest's `layers` map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDefinition {
  /// Pointer to the archive that backs this layer.
  pub package: LayerPackage,

  /// Display name of the published layer.
  pub name: String,

  pub description: String,

  pub compatible_runtimes: Vec<String>,

  pub compatible_architectures: Vec<String>,

  pub license_info: String,

  /// Account-access grant. `Some(["*"])` publishes the layer to every
  /// account; the host tool distinguishes an omitted field from an empty
  /// list, so this stays absent (not empty) for private layers.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub allowed_accounts: Option<Vec<String>>,
}

/// Package section of a layer definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerPackage {
  pub artifact: String,
}

impl FunctionDefinition {
  /// Construct a handler-based function with no overrides.
  pub fn handler(handler: &str) -> Self {
    Self {
      kind: FunctionKind::Handler {
        handler: handler.to_string(),
      },
      runtime: None,
      architecture: None,
      layers: Vec::new(),
      omit_layer: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  mod deserialization {
    use super::*;

    #[test]
    fn parses_service_manifest() {
      let manifest: ServiceManifest = serde_yaml::from_str(
        r#"
        service: my-service
        provider:
          runtime: provided.al2
          architecture: arm64
        functions:
          api:
            handler: src/index.fetch
          worker:
            image: 000000000000.dkr.ecr.us-east-1.amazonaws.com/worker:latest
            runtime: provided
            omitLayer: true
        "#,
      )
      .unwrap();

      assert_eq!(manifest.service, "my-service");
      assert_eq!(manifest.provider.runtime.as_deref(), Some("provided.al2"));
      assert_eq!(manifest.functions.len(), 2);

      let api = &manifest.functions["api"];
      assert!(matches!(&api.kind, FunctionKind::Handler { handler } if handler == "src/index.fetch"));
      assert!(!api.omit_layer);

      let worker = &manifest.functions["worker"];
      assert!(matches!(&worker.kind, FunctionKind::Image { .. }));
      assert_eq!(worker.runtime.as_deref(), Some("provided"));
      assert!(worker.omit_layer);
    }

    #[test]
    fn function_order_follows_declaration_order() {
      let manifest: ServiceManifest = serde_yaml::from_str(
        r#"
        service: ordered
        functions:
          zeta: { handler: z.run }
          alpha: { handler: a.run }
          mid: { handler: m.run }
        "#,
      )
      .unwrap();

      let names: Vec<&str> = manifest.functions.keys().map(String::as_str).collect();
      assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn layer_refs_accept_arns_and_named_pointers() {
      let function: FunctionDefinition = serde_yaml::from_str(
        r#"
        handler: src/index.fetch
        layers:
          - arn:aws:lambda:us-east-1:000000000000:layer:other:3
          - Ref: BunLambdaLayer
        "#,
      )
      .unwrap();

      assert_eq!(
        function.layers,
        [
          LayerRef::Arn("arn:aws:lambda:us-east-1:000000000000:layer:other:3".to_string()),
          LayerRef::Ref {
            logical_id: "BunLambdaLayer".to_string(),
          },
        ]
      );
    }
  }

  mod serialization {
    use super::*;

    #[test]
    fn named_pointer_serializes_as_ref_object() {
      let reference = LayerRef::Ref {
        logical_id: "BunLambdaLayer".to_string(),
      };

      let yaml = serde_yaml::to_string(&reference).unwrap();
      assert!(yaml.contains("Ref: BunLambdaLayer"));
    }

    #[test]
    fn absent_allowed_accounts_is_omitted() {
      let definition = LayerDefinition {
        package: LayerPackage {
          artifact: "./bun-lambda-layer.zip".to_string(),
        },
        name: "my-service-bun".to_string(),
        description: "test".to_string(),
        compatible_runtimes: vec!["provided".to_string()],
        compatible_architectures: vec!["arm64".to_string()],
        license_info: "MIT".to_string(),
        allowed_accounts: None,
      };

      let yaml = serde_yaml::to_string(&definition).unwrap();
      assert!(!yaml.contains("allowedAccounts"));
      assert!(yaml.contains("licenseInfo: MIT"));
      assert!(yaml.contains("compatibleRuntimes"));
    }
  }
}
