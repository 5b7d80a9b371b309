use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::compiler::diagnostics::DiagnosticSet;
use crate::compiler::input::{CompilerInput, ValidatedRequest};
use crate::compiler::output::{extract_artifacts, CompileResult, ContractArtifact, RawCompilerOutput};
use crate::internal::config::{CompilerConfig, InvocationMode};
use crate::internal::errors::Result;
use crate::internal::path::{allow_paths_argument, file_name_identifier, parent_dir};
use crate::internal::process::{ProcessInvocation, ProcessOutput};
use crate::internal::settings::InputSettings;

const STANDARD_JSON_FLAG: &str = "--standard-json";
const ALLOW_PATHS_FLAG: &str = "--allow-paths";

/// One compiler run: the files it covers and the document it is fed.
#[derive(Clone, Debug, PartialEq)]
pub struct CompileJob {
  pub files: Vec<PathBuf>,
  pub input: CompilerInput,
}

impl CompileJob {
  fn working_dir(&self) -> Option<&Path> {
    self.files.first().and_then(|file| parent_dir(file))
  }

  pub(crate) fn invocation(&self, solc: &Path) -> Result<ProcessInvocation> {
    let payload = self.input.to_json_bytes()?;
    let invocation = ProcessInvocation::new(solc)
      .arg(STANDARD_JSON_FLAG)
      .arg(ALLOW_PATHS_FLAG)
      .arg(allow_paths_argument(&self.files))
      .current_dir(self.working_dir())
      .stdin(payload);
    tracing::debug!(
      program = %invocation.program().display(),
      args = ?invocation.args(),
      cwd = ?invocation.working_dir(),
      input_bytes = invocation.payload().map_or(0, <[u8]>::len),
      "launching compiler"
    );
    Ok(invocation)
  }
}

/// Split a validated request into compiler runs according to the configured invocation mode.
pub(crate) fn plan_jobs(config: &CompilerConfig, request: &ValidatedRequest) -> Vec<CompileJob> {
  let settings = InputSettings::new(
    request.optimizer,
    config.evm_version,
    config.use_literal_content,
    &config.output_selection,
  );
  let document = || CompilerInput::new(config.language, settings.clone());

  match config.invocation {
    InvocationMode::PerFile => request
      .files
      .iter()
      .map(|file| CompileJob {
        files: vec![file.clone()],
        input: document().with_source(file_name_identifier(file), file),
      })
      .collect(),
    InvocationMode::Batch => {
      let input = request.files.iter().fold(document(), |input, file| {
        input.with_source(file.to_string_lossy(), file)
      });
      vec![CompileJob {
        files: request.files.clone(),
        input,
      }]
    }
  }
}

/// Merges the outcome of successive runs into one [`CompileResult`].
#[derive(Debug, Default)]
pub(crate) struct CompileAccumulator {
  artifacts: BTreeMap<String, ContractArtifact>,
  diagnostics: DiagnosticSet,
}

impl CompileAccumulator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn absorb(&mut self, job: &CompileJob, output: ProcessOutput) -> Result<()> {
    tracing::debug!(files = ?job.files, status = ?output.status, "compiler run finished");
    if !output.success() {
      tracing::warn!(files = ?job.files, status = ?output.status, "compiler exited unsuccessfully");
    }
    let ProcessOutput { stdout, stderr, .. } = output;
    if !stderr.trim().is_empty() {
      tracing::warn!(files = ?job.files, stderr = %stderr.trim(), "compiler wrote to stderr");
    }

    let raw = RawCompilerOutput::from_stdout(&stdout, &job.files)?;
    let artifacts = extract_artifacts(raw.contracts, &job.files)?;
    self.artifacts.extend(artifacts);
    self.diagnostics.extend_raw(raw.errors.unwrap_or_default());
    Ok(())
  }

  pub fn finish(self) -> CompileResult {
    CompileResult {
      output: self.artifacts,
      errors: self.diagnostics.into_vec(),
    }
  }
}
