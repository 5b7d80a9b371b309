use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::internal::settings::{default_facets, EvmVersion, SourceLanguage};
use crate::internal::solc::default_solc_path;

/// How the files of one request are handed to the compiler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvocationMode {
  /// One compiler run per file, each file registered under its file name.
  #[default]
  PerFile,
  /// A single compiler run for every file, each registered under its absolute path.
  Batch,
}

/// Finalised configuration consumed by the compiler facade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
  pub solc_path: PathBuf,
  pub language: SourceLanguage,
  pub evm_version: EvmVersion,
  pub use_literal_content: bool,
  pub output_selection: Vec<String>,
  pub invocation: InvocationMode,
}

impl Default for CompilerConfig {
  fn default() -> Self {
    CompilerConfig {
      solc_path: default_solc_path(),
      language: SourceLanguage::default(),
      evm_version: EvmVersion::default(),
      use_literal_content: true,
      output_selection: default_facets(),
      invocation: InvocationMode::default(),
    }
  }
}

impl CompilerConfig {
  pub fn merged(&self, overrides: &CompilerConfigOptions) -> Self {
    CompilerConfigBuilder::with_base(self.clone())
      .apply_options(overrides.clone())
      .build()
  }

  pub fn merge_options(&self, options: Option<&CompilerConfigOptions>) -> Self {
    let mut builder = CompilerConfigBuilder::with_base(self.clone());
    if let Some(overrides) = options {
      builder = builder.apply_options(overrides.clone());
    }
    builder.build()
  }

  pub fn from_options(options: Option<CompilerConfigOptions>) -> Self {
    let mut builder = CompilerConfigBuilder::from_defaults();
    if let Some(overrides) = options {
      builder = builder.apply_options(overrides);
    }
    builder.build()
  }
}

/// Optional overrides merged on top of a [`CompilerConfig`]. Deserialises from camelCase JSON so
/// bindings can pass options objects straight through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfigOptions {
  pub solc_path: Option<PathBuf>,
  pub language: Option<SourceLanguage>,
  pub evm_version: Option<EvmVersion>,
  pub use_literal_content: Option<bool>,
  pub output_selection: Option<Vec<String>>,
  pub invocation: Option<InvocationMode>,
}

#[derive(Default)]
pub(crate) struct CompilerConfigBuilder {
  config: CompilerConfig,
}

impl CompilerConfigBuilder {
  pub fn from_defaults() -> Self {
    Self {
      config: CompilerConfig::default(),
    }
  }

  pub fn with_base(base: CompilerConfig) -> Self {
    Self { config: base }
  }

  pub fn apply_options(mut self, overrides: CompilerConfigOptions) -> Self {
    let CompilerConfigOptions {
      solc_path,
      language,
      evm_version,
      use_literal_content,
      output_selection,
      invocation,
    } = overrides;

    if let Some(path) = solc_path {
      self.config.solc_path = path;
    }
    if let Some(language) = language {
      self.config.language = language;
    }
    if let Some(evm_version) = evm_version {
      self.config.evm_version = evm_version;
    }
    if let Some(literal) = use_literal_content {
      self.config.use_literal_content = literal;
    }
    if let Some(selection) = output_selection {
      self.config.output_selection = selection;
    }
    if let Some(invocation) = invocation {
      self.config.invocation = invocation;
    }

    self
  }

  pub fn build(mut self) -> CompilerConfig {
    self.config.output_selection.retain(|facet| !facet.trim().is_empty());
    if self.config.output_selection.is_empty() {
      self.config.output_selection = default_facets();
    }
    self.config
  }
}
