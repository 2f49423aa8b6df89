use std::path::PathBuf;

use anyhow::Result;
use bunlayer_core::{Architecture, BuildConfig, BuildOutcome, LayerBuilder, consts};
use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

/// Build the Bun AWS Lambda layer archive.
///
/// Standalone entry point for the layer build: downloads the requested Bun
/// release, assembles the layer archive, and writes it to the output path.
/// Exits 0 when the archive was built or is already current.
#[derive(Parser)]
#[command(name = "bunlayer", version, about)]
struct Cli {
  /// Bun release to download (a version tag, or "latest")
  #[arg(short, long, default_value = consts::DEFAULT_RELEASE)]
  release: String,

  /// Target CPU architecture
  #[arg(short, long, value_enum, default_value_t = ArchArg::Aarch64)]
  arch: ArchArg,

  /// Download the release archive from this URL instead of the official endpoint
  #[arg(short = 'u', long = "url")]
  source_url: Option<String>,

  /// Path to write the layer archive to
  #[arg(short, long, default_value = consts::DEFAULT_OUTPUT_PATH)]
  output: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ArchArg {
  Aarch64,
  X64,
}

impl From<ArchArg> for Architecture {
  fn from(arch: ArchArg) -> Self {
    match arch {
      ArchArg::Aarch64 => Architecture::Aarch64,
      ArchArg::X64 => Architecture::X64,
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  let builder = LayerBuilder::new(BuildConfig {
    release: cli.release,
    architecture: cli.arch.into(),
    source_url: cli.source_url,
    output_path: cli.output.clone(),
  });

  match builder.build().await? {
    BuildOutcome::AlreadyCurrent => {
      eprintln!(
        "{} {} is already current",
        "✓".green().bold(),
        cli.output.display()
      );
    }
    BuildOutcome::Built => {
      eprintln!("{} wrote {}", "✓".green().bold(), cli.output.display());
    }
  }

  Ok(())
}
