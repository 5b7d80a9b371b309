#[cfg(feature = "node")]
#[macro_use]
extern crate napi_derive;

mod compiler;
mod internal;

#[cfg(feature = "node")]
pub use compiler::{CompileTask, JsSolcNative};
pub use compiler::{
  link::{collect_link_references, unlinked_libraries, LinkReference, LinkSpanError},
  output::{RawCompilerOutput, RawDiagnostic},
  placeholder_symbol, resolve_link_references, CompileRequest, CompileResult, Compiler,
  CompilerInfo, CompilerInput, ContractArtifact, Diagnostic, DiagnosticSet, DiagnosticSource,
  LinkOffset, LinkReferences, Severity, SourceReference,
};
pub use internal::config::{CompilerConfig, CompilerConfigOptions, InvocationMode};
pub use internal::errors::{Error, Result};
pub use internal::settings::{
  EvmVersion, InputSettings, OptimizerSettings, SettingsMetadata, SourceLanguage,
  DEFAULT_OUTPUT_SELECTION,
};
pub use internal::solc::{native_compiler_path, parse_version_output, NATIVE_COMPILER_DIR};
