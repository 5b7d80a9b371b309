use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use semver::Version;

use super::process::{ProcessInvocation, ProcessOutput};

/// Directory the installer unpacks the native compiler into.
pub const NATIVE_COMPILER_DIR: &str = "native_compiler";

#[cfg(windows)]
pub const SOLC_BINARY: &str = "solc.exe";
#[cfg(not(windows))]
pub const SOLC_BINARY: &str = "solc";

const VERSION_PREFIX: &str = "version:";

/// Location of the compiler inside an installer layout rooted at `root`.
pub fn native_compiler_path(root: &Path) -> PathBuf {
  root.join(NATIVE_COMPILER_DIR).join(SOLC_BINARY)
}

/// Default binary, resolved through `PATH` when spawned.
pub fn default_solc_path() -> PathBuf {
  PathBuf::from(SOLC_BINARY)
}

/// Extract the version text from `solc --version` output: the first line that starts with
/// `Version:` (any case) once control characters are stripped.
pub fn parse_version_output(stdout: &str) -> Option<String> {
  stdout.split('\n').find_map(|line| {
    let cleaned: String = line.chars().filter(|ch| !ch.is_control()).collect();
    let head = cleaned.get(..VERSION_PREFIX.len())?;
    if head.eq_ignore_ascii_case(VERSION_PREFIX) {
      Some(cleaned[VERSION_PREFIX.len()..].trim().to_owned())
    } else {
      None
    }
  })
}

/// Parse the semantic part of a solc version string such as
/// `0.4.24+commit.e67f0147.Linux.g++`. Build metadata is dropped since solc's platform suffix is
/// not valid semver.
pub fn parse_semantic_version(version: &str) -> Option<Version> {
  let trimmed = version.trim().trim_start_matches('v');
  let core = trimmed.split('+').next()?;
  Version::parse(core).ok()
}

/// Compute-once holder for the compiler version string. A failed detection caches the empty
/// string; callers treat it as "unknown".
#[derive(Debug, Default)]
pub struct VersionCache {
  value: OnceLock<String>,
}

impl VersionCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get_or_detect(&self, solc: &Path) -> &str {
    self.value.get_or_init(|| detect_version(solc))
  }

  pub fn get(&self) -> Option<&str> {
    self.value.get().map(String::as_str)
  }
}

impl Clone for VersionCache {
  fn clone(&self) -> Self {
    let value = OnceLock::new();
    if let Some(version) = self.get() {
      let _ = value.set(version.to_owned());
    }
    Self { value }
  }
}

fn detect_version(solc: &Path) -> String {
  let invocation = ProcessInvocation::new(solc).arg("--version");
  match invocation.run_blocking() {
    Ok(ProcessOutput { stdout, .. }) => parse_version_output(&stdout).unwrap_or_default(),
    Err(err) => {
      tracing::debug!(solc = %solc.display(), error = %err, "compiler version detection failed");
      String::new()
    }
  }
}
