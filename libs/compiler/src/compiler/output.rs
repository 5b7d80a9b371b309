use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::link::{resolve_link_references, unlinked_libraries, LinkReferences};
use crate::internal::errors::{map_malformed, Error, Result};

/// Compiler name recorded in every artifact.
pub const COMPILER_NAME: &str = "solc";

// -----------------------------------------------------------------------------
// Raw standard-JSON output
// -----------------------------------------------------------------------------

/// Decoded standard output of one compiler run. Only the fields this crate consumes are
/// modelled; everything else is ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawCompilerOutput {
  #[serde(default)]
  pub contracts: Option<BTreeMap<String, BTreeMap<String, RawContract>>>,
  #[serde(default)]
  pub errors: Option<Vec<RawDiagnostic>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawContract {
  #[serde(default)]
  pub metadata: Option<String>,
  #[serde(default)]
  pub evm: Option<RawEvm>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawEvm {
  #[serde(default)]
  pub bytecode: Option<RawBytecode>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBytecode {
  #[serde(default)]
  pub object: Option<String>,
  #[serde(default)]
  pub link_references: Option<LinkReferences>,
  #[serde(default)]
  pub source_map: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDiagnostic {
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub formatted_message: Option<String>,
  pub severity: Severity,
  #[serde(default)]
  pub source_location: Option<RawSourceLocation>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSourceLocation {
  #[serde(default)]
  pub file: Option<String>,
  #[serde(default)]
  pub start: Option<i64>,
}

/// The `metadata` string of a contract, decoded.
#[derive(Clone, Debug, Default, Deserialize)]
struct ContractMetadata {
  #[serde(default)]
  compiler: Option<MetadataCompiler>,
  #[serde(default)]
  output: Option<MetadataOutput>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct MetadataCompiler {
  #[serde(default)]
  version: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct MetadataOutput {
  #[serde(default)]
  abi: Option<Value>,
  #[serde(default)]
  devdoc: Option<Value>,
  #[serde(default)]
  userdoc: Option<Value>,
}

impl RawCompilerOutput {
  /// Decode the standard output of the run compiling `files`. Empty or non-JSON output is
  /// unreadable; JSON of the wrong shape is malformed.
  pub fn from_stdout(stdout: &str, files: &[PathBuf]) -> Result<Self> {
    if stdout.trim().is_empty() {
      return Err(Error::unreadable(files));
    }
    let value: Value = serde_json::from_str(stdout).map_err(|_| Error::unreadable(files))?;
    map_malformed(
      serde_json::from_value(value),
      files,
      "unexpected output structure",
    )
  }
}

// -----------------------------------------------------------------------------
// Shared diagnostic types
// -----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Error,
  Warning,
  Info,
}

impl Severity {
  pub fn as_str(&self) -> &'static str {
    match self {
      Severity::Error => "error",
      Severity::Warning => "warning",
      Severity::Info => "info",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticSource {
  pub file: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub offset: Option<i64>,
}

/// A compiler message reduced to what callers need: the formatted text, the severity, and where
/// it points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
  pub message: String,
  pub severity: Severity,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<DiagnosticSource>,
}

// -----------------------------------------------------------------------------
// Artifacts
// -----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerInfo {
  pub name: String,
  pub version: String,
}

/// Build output of one contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
  pub contract_name: String,
  pub source_path: String,
  pub compiler: CompilerInfo,
  /// Creation bytecode with unlinked library slots rewritten to `__Name____` symbols.
  pub bytecode: String,
  pub abi: Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_map: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub devdoc: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub userdoc: Option<Value>,
}

impl ContractArtifact {
  /// Whether every library slot has been filled in.
  pub fn is_linked(&self) -> bool {
    !self.bytecode.contains('_')
  }

  /// Libraries still referenced through placeholders, in order of first appearance.
  pub fn unlinked_libraries(&self) -> Vec<String> {
    unlinked_libraries(&self.bytecode)
  }

  /// Raw bytecode, available only once the artifact is linked.
  pub fn bytecode_bytes(&self) -> Option<Vec<u8>> {
    if !self.is_linked() {
      return None;
    }
    let hex_text = self.bytecode.trim_start_matches("0x");
    hex::decode(hex_text).ok()
  }
}

/// Aggregated result of one `compile` call. Serialises as `{"output": ..., "errors": ...}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileResult {
  pub output: BTreeMap<String, ContractArtifact>,
  pub errors: Vec<Diagnostic>,
}

impl CompileResult {
  pub fn has_errors(&self) -> bool {
    self
      .errors
      .iter()
      .any(|diagnostic| diagnostic.severity == Severity::Error)
  }

  pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
    self
      .errors
      .iter()
      .filter(|diagnostic| diagnostic.severity == Severity::Warning)
  }

  pub fn artifact(&self, name: &str) -> Option<&ContractArtifact> {
    self.output.get(name)
  }
}

// -----------------------------------------------------------------------------
// Extraction
// -----------------------------------------------------------------------------

/// Turn the `contracts` section of one run into artifacts keyed by contract name. Contracts
/// without creation bytecode are skipped; a later contract with the same name replaces an
/// earlier one.
pub fn extract_artifacts(
  contracts: Option<BTreeMap<String, BTreeMap<String, RawContract>>>,
  files: &[PathBuf],
) -> Result<BTreeMap<String, ContractArtifact>> {
  let mut artifacts = BTreeMap::new();
  let Some(contracts) = contracts else {
    return Ok(artifacts);
  };

  for (source_path, entries) in contracts {
    for (name, contract) in entries {
      match extract_contract(&source_path, &name, contract, files) {
        Ok(Some(artifact)) => {
          artifacts.insert(name, artifact);
        }
        Ok(None) => {
          tracing::trace!(source = %source_path, contract = %name, "skipping contract without bytecode");
        }
        Err(err) => return Err(err.in_contract(&name)),
      }
    }
  }

  Ok(artifacts)
}

fn extract_contract(
  source_path: &str,
  name: &str,
  contract: RawContract,
  files: &[PathBuf],
) -> Result<Option<ContractArtifact>> {
  let RawContract { metadata, evm } = contract;
  let Some(bytecode) = evm.and_then(|evm| evm.bytecode) else {
    return Ok(None);
  };
  let RawBytecode {
    object,
    link_references,
    source_map,
  } = bytecode;
  let Some(object) = object.filter(|object| !object.is_empty()) else {
    return Ok(None);
  };

  let bytecode = map_malformed(
    resolve_link_references(&object, link_references.as_ref()),
    files,
    "invalid link reference",
  )?;

  let metadata = metadata.ok_or_else(|| Error::malformed(files, "contract metadata is missing"))?;
  let metadata: ContractMetadata = map_malformed(
    serde_json::from_str(&metadata),
    files,
    "contract metadata is not valid JSON",
  )?;
  let output = metadata.output.unwrap_or_default();
  let abi = output
    .abi
    .filter(|abi| abi.is_array() || abi.is_object())
    .ok_or_else(|| Error::malformed(files, "contract metadata has no ABI"))?;

  Ok(Some(ContractArtifact {
    contract_name: name.to_owned(),
    source_path: source_path.to_owned(),
    compiler: CompilerInfo {
      name: COMPILER_NAME.to_owned(),
      version: metadata
        .compiler
        .and_then(|compiler| compiler.version)
        .unwrap_or_default(),
    },
    bytecode,
    abi,
    source_map: source_map.filter(|map| !map.is_empty()),
    devdoc: output.devdoc.filter(Value::is_object),
    userdoc: output.userdoc.filter(Value::is_object),
  }))
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
