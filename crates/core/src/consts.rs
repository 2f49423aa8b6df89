//! Fixed endpoints, filenames, and compatibility sets for the Bun layer.

/// Canonical download endpoint for Bun release archives.
pub const DOWNLOAD_BASE_URL: &str = "https://bun.sh/download";

/// Canonical source for the layer's supplementary files.
pub const ASSETS_BASE_URL: &str = "https://raw.githubusercontent.com/oven-sh/bun/main/packages/bun-lambda";

/// Name of the executable inside the downloaded release archive.
pub const EXECUTABLE_NAME: &str = "bun";

/// Entry-point script added to the layer.
pub const BOOTSTRAP_FILENAME: &str = "bootstrap";

/// Runtime shim script added to the layer.
pub const RUNTIME_FILENAME: &str = "runtime.ts";

/// Sentinel file holding the validation tag of the last download.
pub const ETAG_FILENAME: &str = ".etag.txt";

/// Lambda runtimes the layer can attach to (the two spellings of the
/// custom-runtime execution mode).
pub const COMPATIBLE_RUNTIMES: &[&str] = &["provided", "provided.al2"];

/// License recorded on the published layer.
pub const LAYER_LICENSE: &str = "MIT";

/// Description recorded on the published layer.
pub const LAYER_DESCRIPTION: &str =
  "Bun is an incredibly fast JavaScript runtime, bundler, transpiler, and package manager.";

/// Default release when none is configured.
pub const DEFAULT_RELEASE: &str = "latest";

/// Default path for the produced layer archive.
pub const DEFAULT_OUTPUT_PATH: &str = "./bun-lambda-layer.zip";

/// Default key for the layer entry in the service manifest.
pub const DEFAULT_LAYER_KEY: &str = "bun";
