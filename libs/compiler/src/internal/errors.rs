use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};

/// Canonical error type used by the Rust-facing API surface. Every variant is terminal for the
/// `compile` call that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Supplied options are invalid: {0}")]
  InvalidRequest(String),

  #[error("Invalid optimizer run option: {0}")]
  InvalidOptimizerRuns(String),

  #[error("Invalid input file \"{path}\": {reason}")]
  InvalidInputPath { path: String, reason: String },

  #[error("Unable to run compiler {}: {source}", .program.display())]
  CompilerLaunchFailed {
    program: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("Unexpected output while compiling {}", display_files(.files))]
  CompilerOutputUnreadable { files: Vec<PathBuf> },

  #[error("Malformed compiler output while compiling {}{}: {reason}", display_files(.files), display_contract(.contract))]
  MalformedOutput {
    files: Vec<PathBuf>,
    contract: Option<String>,
    reason: String,
  },

  #[error("Failed to serialise compiler input: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
    Error::InvalidInputPath {
      path: path.into(),
      reason: reason.into(),
    }
  }

  pub(crate) fn launch_failed(program: &Path, source: io::Error) -> Self {
    Error::CompilerLaunchFailed {
      program: program.to_path_buf(),
      source,
    }
  }

  pub(crate) fn unreadable(files: &[PathBuf]) -> Self {
    Error::CompilerOutputUnreadable {
      files: files.to_vec(),
    }
  }

  pub(crate) fn malformed(files: &[PathBuf], reason: impl Into<String>) -> Self {
    Error::MalformedOutput {
      files: files.to_vec(),
      contract: None,
      reason: reason.into(),
    }
  }

  /// Attach the contract being extracted to a [`Error::MalformedOutput`]. Other variants are
  /// returned untouched.
  pub(crate) fn in_contract(self, name: &str) -> Self {
    match self {
      Error::MalformedOutput {
        files,
        contract: None,
        reason,
      } => Error::MalformedOutput {
        files,
        contract: Some(name.to_owned()),
        reason,
      },
      other => other,
    }
  }

  /// Source files the failing invocation was compiling, when the error is tied to one.
  pub fn files(&self) -> &[PathBuf] {
    match self {
      Error::CompilerOutputUnreadable { files } | Error::MalformedOutput { files, .. } => files,
      _ => &[],
    }
  }
}

fn display_files(files: &[PathBuf]) -> String {
  files
    .iter()
    .map(|file| file.display().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}

fn display_contract(contract: &Option<String>) -> String {
  contract
    .as_deref()
    .map(|name| format!(" (contract {name})"))
    .unwrap_or_default()
}

/// Result alias bound to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Annotate a decoding failure from `result` as malformed output of the invocation compiling
/// `files`.
pub(crate) fn map_malformed<T, E>(
  result: std::result::Result<T, E>,
  files: &[PathBuf],
  context: &str,
) -> Result<T>
where
  E: Display,
{
  result.map_err(|err| Error::malformed(files, format!("{context}: {err}")))
}

#[cfg(feature = "node")]
impl From<Error> for napi::Error {
  fn from(err: Error) -> Self {
    napi::Error::new(napi::Status::GenericFailure, err.to_string())
  }
}
