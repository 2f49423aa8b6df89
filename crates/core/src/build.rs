//! Layer Builder: downloads a Bun release and assembles the layer archive.
//!
//! The builder keeps the produced archive fresh with a conditional-request
//! scheme: the validation tag (`ETag`) of the last successful download is
//! stamped into the archive itself (`.etag.txt`), read back on the next run,
//! and sent as `If-None-Match`. A `304 Not Modified` response leaves the
//! archive untouched; anything else rebuilds it from scratch.

use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use reqwest::header;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

use crate::config::{Architecture, PluginConfig};
use crate::consts;

/// Errors that can occur while building the layer archive.
///
/// Every variant is terminal: the build aborts and surfaces it to the
/// caller, nothing is retried.
#[derive(Debug, Error)]
pub enum BuildError {
  /// The output file exists but could not be read as a layer archive.
  /// Absence of the file is not an error; anything else must not be
  /// mistaken for "no cache", or a transient fault would overwrite an
  /// unrelated artifact.
  #[error("failed to read cached layer at '{path}': {message}")]
  CacheRead { path: PathBuf, message: String },

  /// The primary download failed (transport fault or non-2xx status).
  #[error("failed to download bun from '{url}': {message}")]
  Fetch { url: String, message: String },

  /// The download succeeded but carried no `ETag` header, so freshness
  /// state cannot be recorded.
  #[error("download response from '{url}' carried no ETag header")]
  MissingTag { url: String },

  /// The downloaded bytes are not a valid zip archive.
  #[error("downloaded archive could not be unpacked: {0}")]
  Unpack(#[source] zip::result::ZipError),

  /// The downloaded archive contains no executable entry.
  #[error("no '{name}' executable found in the downloaded archive")]
  ExecutableNotFound { name: &'static str },

  /// One of the supplementary file fetches failed.
  #[error("failed to fetch layer file '{file}' from '{url}': {message}")]
  AugmentationFetch {
    file: &'static str,
    url: String,
    message: String,
  },

  /// Serializing the final archive or writing it to disk failed.
  #[error("failed to write layer archive to '{path}': {message}")]
  Persist { path: PathBuf, message: String },
}

/// Result of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
  /// The upstream content is unchanged; the existing archive was left as is.
  AlreadyCurrent,
  /// A new archive was written to the output path.
  Built,
}

/// Parameters for one build run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
  pub release: String,
  pub architecture: Architecture,
  pub source_url: Option<String>,
  pub output_path: PathBuf,
}

impl From<&PluginConfig> for BuildConfig {
  fn from(config: &PluginConfig) -> Self {
    Self {
      release: config.release.clone(),
      architecture: config.architecture,
      source_url: config.source_url.clone(),
      output_path: config.output_path.clone(),
    }
  }
}

/// Builds (or revalidates) the layer archive on disk.
pub struct LayerBuilder {
  config: BuildConfig,
  assets_base: String,
  client: reqwest::Client,
}

impl LayerBuilder {
  pub fn new(config: BuildConfig) -> Self {
    Self {
      config,
      assets_base: consts::ASSETS_BASE_URL.to_string(),
      client: reqwest::Client::new(),
    }
  }

  /// Fetch `bootstrap` and `runtime.ts` from a mirror instead of the
  /// canonical source.
  pub fn with_assets_base(mut self, base: impl Into<String>) -> Self {
    self.assets_base = base.into();
    self
  }

  /// The URL the runtime archive is downloaded from: the configured
  /// `sourceURL` verbatim, or the official endpoint for the configured
  /// release and architecture (requesting the CPU-feature-optimized build).
  pub fn download_url(&self) -> String {
    match &self.config.source_url {
      Some(url) => url.clone(),
      None => format!(
        "{}/{}/linux/{}?avx2=true&profile=false",
        consts::DOWNLOAD_BASE_URL,
        self.config.release,
        self.config.architecture.as_str()
      ),
    }
  }

  /// Run the build pipeline.
  ///
  /// Steps: probe the cached archive for its validation tag, issue a
  /// conditional GET, short-circuit on 304, otherwise unpack the response,
  /// add `bootstrap`/`runtime.ts`/`.etag.txt` next to the executable, and
  /// atomically persist the repacked archive at maximum compression.
  pub async fn build(&self) -> Result<BuildOutcome, BuildError> {
    let cached_tag = self.read_cached_tag().await?;
    let url = self.download_url();

    info!(url = %url, conditional = cached_tag.is_some(), "downloading bun runtime");
    let mut request = self.client.get(&url);
    if let Some(tag) = &cached_tag {
      request = request.header(header::IF_NONE_MATCH, tag.as_str());
    }
    let response = request.send().await.map_err(|e| BuildError::Fetch {
      url: url.clone(),
      message: e.to_string(),
    })?;

    if response.status() == StatusCode::NOT_MODIFIED {
      info!(path = %self.config.output_path.display(), "layer archive is already current");
      return Ok(BuildOutcome::AlreadyCurrent);
    }

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(BuildError::Fetch {
        url,
        message: format!("HTTP {status}: {body}"),
      });
    }

    let tag = response
      .headers()
      .get(header::ETAG)
      .and_then(|value| value.to_str().ok())
      .map(str::to_owned)
      .ok_or_else(|| BuildError::MissingTag { url: url.clone() })?;

    let body = response.bytes().await.map_err(|e| BuildError::Fetch {
      url: url.clone(),
      message: e.to_string(),
    })?;
    debug!(bytes = body.len(), tag = %tag, "downloaded runtime archive");

    let mut archive = ZipArchive::new(Cursor::new(body.to_vec())).map_err(BuildError::Unpack)?;
    let root = locate_root(&archive)?;
    debug!(root = %root, "assembling layer archive");

    // Independent reads with no ordering between them.
    let (bootstrap, runtime) = tokio::try_join!(
      self.fetch_asset(consts::BOOTSTRAP_FILENAME),
      self.fetch_asset(consts::RUNTIME_FILENAME),
    )?;

    let bytes = self.assemble(&mut archive, &root, &bootstrap, &runtime, &tag)?;
    self.persist(&bytes)?;

    info!(path = %self.config.output_path.display(), bytes = bytes.len(), "layer archive written");
    Ok(BuildOutcome::Built)
  }

  /// Read the validation tag out of the existing archive, if any.
  ///
  /// Returns `Ok(None)` only when the output file does not exist. A file
  /// that exists but cannot be read, is not a zip, or has no sentinel entry
  /// aborts the build with [`BuildError::CacheRead`].
  async fn read_cached_tag(&self) -> Result<Option<String>, BuildError> {
    let path = &self.config.output_path;
    let cache_err = |message: String| BuildError::CacheRead {
      path: path.clone(),
      message,
    };

    let bytes = match fs::read(path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(cache_err(e.to_string())),
    };

    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| cache_err(e.to_string()))?;

    let nested = format!("/{}", consts::ETAG_FILENAME);
    let sentinel = archive
      .file_names()
      .find(|name| *name == consts::ETAG_FILENAME || name.ends_with(&nested))
      .map(str::to_owned)
      .ok_or_else(|| cache_err(format!("archive has no {} entry", consts::ETAG_FILENAME)))?;

    let mut entry = archive.by_name(&sentinel).map_err(|e| cache_err(e.to_string()))?;
    let mut tag = String::new();
    entry
      .read_to_string(&mut tag)
      .map_err(|e| cache_err(e.to_string()))?;
    let tag = tag.trim().to_string();

    debug!(path = %path.display(), tag = %tag, "found cached layer archive");
    Ok(Some(tag))
  }

  /// Fetch one supplementary text file from the assets source.
  async fn fetch_asset(&self, file: &'static str) -> Result<String, BuildError> {
    let url = format!("{}/{}", self.assets_base, file);
    debug!(url = %url, "fetching layer file");

    let response = self
      .client
      .get(&url)
      .send()
      .await
      .map_err(|e| BuildError::AugmentationFetch {
        file,
        url: url.clone(),
        message: e.to_string(),
      })?;

    if !response.status().is_success() {
      return Err(BuildError::AugmentationFetch {
        file,
        url,
        message: format!("HTTP {}", response.status()),
      });
    }

    response.text().await.map_err(|e| BuildError::AugmentationFetch {
      file,
      url: url.clone(),
      message: e.to_string(),
    })
  }

  /// Repack the downloaded archive with the supplementary files and the
  /// validation tag inserted under `root`, overwriting any entries the
  /// upstream archive already had for them.
  fn assemble(
    &self,
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    root: &str,
    bootstrap: &str,
    runtime: &str,
    tag: &str,
  ) -> Result<Vec<u8>, BuildError> {
    let path = &self.config.output_path;

    let bootstrap_name = format!("{root}{}", consts::BOOTSTRAP_FILENAME);
    let runtime_name = format!("{root}{}", consts::RUNTIME_FILENAME);
    let sentinel_name = format!("{root}{}", consts::ETAG_FILENAME);
    let replaced = [&bootstrap_name, &runtime_name, &sentinel_name];

    let options = SimpleFileOptions::default()
      .compression_method(CompressionMethod::Deflated)
      .compression_level(Some(9));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for index in 0..archive.len() {
      let mut entry = archive.by_index(index).map_err(BuildError::Unpack)?;
      let name = entry.name().to_string();
      if replaced.iter().any(|r| **r == name) {
        continue;
      }

      if entry.is_dir() {
        writer
          .add_directory(name, options)
          .map_err(|e| persist_error(path, e))?;
        continue;
      }

      let entry_options = match entry.unix_mode() {
        Some(mode) => options.unix_permissions(mode),
        None => options,
      };

      let mut contents = Vec::new();
      entry
        .read_to_end(&mut contents)
        .map_err(|e| BuildError::Unpack(zip::result::ZipError::Io(e)))?;

      writer
        .start_file(name, entry_options)
        .map_err(|e| persist_error(path, e))?;
      writer.write_all(&contents).map_err(|e| persist_error(path, e))?;
    }

    for (name, contents, mode) in [
      (&bootstrap_name, bootstrap, 0o755),
      (&runtime_name, runtime, 0o644),
      (&sentinel_name, tag, 0o644),
    ] {
      writer
        .start_file(name.as_str(), options.unix_permissions(mode))
        .map_err(|e| persist_error(path, e))?;
      writer
        .write_all(contents.as_bytes())
        .map_err(|e| persist_error(path, e))?;
    }

    let cursor = writer.finish().map_err(|e| persist_error(path, e))?;
    Ok(cursor.into_inner())
  }

  /// Atomically replace the output file: write to a temporary file in the
  /// destination directory, then rename over the output path.
  fn persist(&self, bytes: &[u8]) -> Result<(), BuildError> {
    let path = &self.config.output_path;
    let dir = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| persist_error(path, e))?;
    tmp.write_all(bytes).map_err(|e| persist_error(path, e))?;
    tmp.persist(path).map_err(|e| persist_error(path, e))?;
    Ok(())
  }
}

fn persist_error(path: &Path, message: impl std::fmt::Display) -> BuildError {
  BuildError::Persist {
    path: path.to_path_buf(),
    message: message.to_string(),
  }
}

/// Find the executable entry and derive the archive's working subtree from
/// it: the directory prefix of the executable's path, or the archive root
/// when the executable sits at the top level.
fn locate_root<R: Read + Seek>(archive: &ZipArchive<R>) -> Result<String, BuildError> {
  let nested = format!("/{}", consts::EXECUTABLE_NAME);

  let executable = archive
    .file_names()
    .find(|name| !name.ends_with('/') && (*name == consts::EXECUTABLE_NAME || name.ends_with(&nested)))
    .map(str::to_owned)
    .ok_or(BuildError::ExecutableNotFound {
      name: consts::EXECUTABLE_NAME,
    })?;

  Ok(match executable.rfind('/') {
    Some(index) => executable[..=index].to_string(),
    None => String::new(),
  })
}
