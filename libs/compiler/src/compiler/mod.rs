use std::path::PathBuf;

use semver::Version;
use serde_json::Value;

use crate::internal::config::{CompilerConfig, CompilerConfigOptions};
use crate::internal::errors::{Error, Result};
use crate::internal::solc::{parse_semantic_version, VersionCache};
use self::core::{plan_jobs, CompileAccumulator, CompileJob};
pub use input::{CompileRequest, CompilerInput, SourceReference};
pub use link::{placeholder_symbol, resolve_link_references, LinkOffset, LinkReferences};
pub use output::{
  CompileResult, CompilerInfo, ContractArtifact, Diagnostic, DiagnosticSource, Severity,
};

#[cfg(feature = "node")]
mod bindings;
mod core;
mod diagnostics;
mod input;
pub mod link;
pub mod output;

#[cfg(test)]
mod compiler_tests;

#[cfg(feature = "node")]
pub use bindings::{CompileTask, JsSolcNative};
pub use diagnostics::DiagnosticSet;

/// Front door to a `solc` binary speaking the standard-JSON protocol. Holds the resolved
/// configuration and the lazily detected compiler version; every `compile` call owns its own
/// input documents and diagnostic set, so one instance can serve concurrent callers.
#[derive(Clone, Debug)]
pub struct Compiler {
  config: CompilerConfig,
  version: VersionCache,
}

impl Default for Compiler {
  fn default() -> Self {
    Self::with_config(CompilerConfig::default())
  }
}

impl Compiler {
  /// Create a compiler using the provided options merged on top of the defaults.
  pub fn new(options: Option<CompilerConfigOptions>) -> Self {
    Self::with_config(CompilerConfig::from_options(options))
  }

  pub fn with_config(config: CompilerConfig) -> Self {
    Self {
      config,
      version: VersionCache::new(),
    }
  }

  /// Default configuration pointed at a specific compiler binary.
  pub fn from_path(solc: impl Into<PathBuf>) -> Self {
    Self::new(Some(CompilerConfigOptions {
      solc_path: Some(solc.into()),
      ..CompilerConfigOptions::default()
    }))
  }

  pub fn config(&self) -> &CompilerConfig {
    &self.config
  }

  /// Version text reported by `solc --version`, e.g. `0.4.24+commit.e67f0147.Linux.g++`. Detected
  /// on first use and cached for the lifetime of this value; an empty string means the binary
  /// could not be queried.
  pub fn version(&self) -> String {
    self.version.get_or_detect(&self.config.solc_path).to_owned()
  }

  pub fn semantic_version(&self) -> Option<Version> {
    parse_semantic_version(self.version.get_or_detect(&self.config.solc_path))
  }

  /// The input documents `compile` would send for `request`, one per compiler run.
  pub fn input_documents(&self, request: &CompileRequest) -> Result<Vec<CompilerInput>> {
    Ok(
      self
        .plan(request)?
        .into_iter()
        .map(|job| job.input)
        .collect(),
    )
  }

  /// Compile `request` on the calling thread. Runs are executed sequentially; the first failure
  /// aborts the call and discards anything gathered so far.
  pub fn compile(&self, request: &CompileRequest) -> Result<CompileResult> {
    let jobs = self.plan(request)?;
    let mut accumulator = CompileAccumulator::new();
    for job in &jobs {
      let invocation = job.invocation(&self.config.solc_path)?;
      let output = invocation
        .run_blocking()
        .map_err(|err| Error::launch_failed(&self.config.solc_path, err))?;
      accumulator.absorb(job, output)?;
    }
    Ok(accumulator.finish())
  }

  /// Same as [`Compiler::compile`] but drives the compiler through `tokio::process`, so the
  /// runtime thread is free while solc works.
  pub async fn compile_async(&self, request: &CompileRequest) -> Result<CompileResult> {
    let jobs = self.plan(request)?;
    let mut accumulator = CompileAccumulator::new();
    for job in &jobs {
      let invocation = job.invocation(&self.config.solc_path)?;
      let output = invocation
        .run()
        .await
        .map_err(|err| Error::launch_failed(&self.config.solc_path, err))?;
      accumulator.absorb(job, output)?;
    }
    Ok(accumulator.finish())
  }

  /// Decode a loosely typed request (`{files, optimize?, optimize_runs?}`) and compile it.
  pub fn compile_value(&self, value: &Value) -> Result<CompileResult> {
    let request = CompileRequest::from_value(value)?;
    self.compile(&request)
  }

  fn plan(&self, request: &CompileRequest) -> Result<Vec<CompileJob>> {
    let validated = request.validate()?;
    let jobs = plan_jobs(&self.config, &validated);
    tracing::debug!(
      files = validated.files.len(),
      runs = jobs.len(),
      mode = ?self.config.invocation,
      "planned compilation"
    );
    Ok(jobs)
  }
}
