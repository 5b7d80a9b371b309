use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::internal::errors::{Error, Result};
use crate::internal::path::normalize_path;
use crate::internal::settings::{InputSettings, OptimizerSettings, SourceLanguage};

/// What to compile and how hard to optimise it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileRequest {
  pub files: Vec<PathBuf>,
  pub optimize: bool,
  pub optimize_runs: Option<i64>,
}

/// A request that passed validation: normalised absolute paths and a resolved optimizer block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ValidatedRequest {
  pub files: Vec<PathBuf>,
  pub optimizer: OptimizerSettings,
}

impl CompileRequest {
  pub fn new<I, P>(files: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    Self {
      files: files.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }

  pub fn file(path: impl Into<PathBuf>) -> Self {
    Self::new([path])
  }

  pub fn optimize(mut self, enabled: bool) -> Self {
    self.optimize = enabled;
    self
  }

  pub fn optimize_runs(mut self, runs: i64) -> Self {
    self.optimize_runs = Some(runs);
    self
  }

  /// Decode a loosely typed request object of the form
  /// `{ files: string | string[], optimize?: boolean, optimize_runs?: number }`.
  ///
  /// Checks run in a fixed order: the shape of the request, then the run count, then the files.
  pub fn from_value(value: &Value) -> Result<Self> {
    let Value::Object(object) = value else {
      return Err(Error::InvalidRequest(
        "expected an object with a `files` entry".to_string(),
      ));
    };

    let optimize = match object.get("optimize") {
      None | Some(Value::Null) => false,
      Some(Value::Bool(enabled)) => *enabled,
      Some(other) => {
        return Err(Error::InvalidRequest(format!(
          "`optimize` must be a boolean, got {other}"
        )))
      }
    };
    let optimize_runs = decode_runs(object)?;
    let files = decode_files(object)?;

    Ok(Self {
      files,
      optimize,
      optimize_runs,
    })
  }

  pub(crate) fn validate(&self) -> Result<ValidatedRequest> {
    let runs = match self.optimize_runs {
      Some(runs) => u32::try_from(runs)
        .map_err(|_| Error::InvalidOptimizerRuns(format!("{runs} is not a non-negative 32-bit integer")))?,
      None => 0,
    };

    if self.files.is_empty() {
      return Err(Error::invalid_path("", "at least one input file is required"));
    }
    let files = self
      .files
      .iter()
      .map(|file| validate_path(file))
      .collect::<Result<Vec<_>>>()?;

    Ok(ValidatedRequest {
      files,
      optimizer: OptimizerSettings {
        enabled: self.optimize,
        runs,
      },
    })
  }
}

fn validate_path(path: &Path) -> Result<PathBuf> {
  if path.as_os_str().is_empty() {
    return Err(Error::invalid_path("", "file names must not be empty"));
  }
  if !path.is_absolute() {
    return Err(Error::invalid_path(
      path.to_string_lossy(),
      "input filename must be an absolute path",
    ));
  }
  Ok(normalize_path(path))
}

fn decode_runs(object: &Map<String, Value>) -> Result<Option<i64>> {
  let runs = match object.get("optimize_runs") {
    None | Some(Value::Null) => return Ok(None),
    Some(Value::Number(number)) => number,
    Some(other) => {
      return Err(Error::InvalidOptimizerRuns(format!(
        "{other} is not a number"
      )))
    }
  };

  if let Some(runs) = runs.as_i64() {
    return Ok(Some(runs));
  }
  match runs.as_f64() {
    Some(float) if float.fract() == 0.0 && float >= i64::MIN as f64 && float <= i64::MAX as f64 => {
      Ok(Some(float as i64))
    }
    _ => Err(Error::InvalidOptimizerRuns(format!(
      "{runs} is not an integer"
    ))),
  }
}

fn decode_files(object: &Map<String, Value>) -> Result<Vec<PathBuf>> {
  match object.get("files") {
    Some(Value::String(file)) => Ok(vec![PathBuf::from(file)]),
    Some(Value::Array(entries)) => entries
      .iter()
      .map(|entry| match entry {
        Value::String(file) => Ok(PathBuf::from(file)),
        other => Err(Error::invalid_path(
          other.to_string(),
          "file names must be strings",
        )),
      })
      .collect(),
    Some(other) => Err(Error::invalid_path(
      other.to_string(),
      "`files` must be a string or an array of strings",
    )),
    None => Err(Error::invalid_path("", "`files` is required")),
  }
}

/// `sources` entry pointing solc at a file on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
  pub urls: Vec<String>,
}

/// The standard-JSON document written to the compiler's standard input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompilerInput {
  pub language: SourceLanguage,
  pub sources: BTreeMap<String, SourceReference>,
  pub settings: InputSettings,
}

impl CompilerInput {
  pub fn new(language: SourceLanguage, settings: InputSettings) -> Self {
    Self {
      language,
      sources: BTreeMap::new(),
      settings,
    }
  }

  pub fn with_source(mut self, identifier: impl Into<String>, path: &Path) -> Self {
    self.sources.insert(
      identifier.into(),
      SourceReference {
        urls: vec![path.to_string_lossy().into_owned()],
      },
    );
    self
  }

  pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(self)?)
  }
}
