//! bunlayer-core: build and inject a Bun runtime layer for AWS Lambda.
//!
//! Two collaborating components driven by one configuration object:
//! - [`build::LayerBuilder`] downloads a Bun release, assembles it into a
//!   layer archive (executable, `bootstrap`, `runtime.ts`, validation tag),
//!   and skips the work entirely when upstream content is unchanged.
//! - [`inject::inject`] registers that archive as a layer in a service
//!   manifest and attaches it to every function whose runtime and
//!   architecture are compatible.

pub mod build;
pub mod config;
pub mod consts;
pub mod inject;
pub mod manifest;
pub mod plugin;

pub use build::{BuildConfig, BuildError, BuildOutcome, LayerBuilder};
pub use config::{Architecture, ConfigError, PluginConfig, RawConfig};
pub use inject::{InjectConfig, inject, layer_logical_id};
pub use manifest::ServiceManifest;
pub use plugin::BunLayerPlugin;
