use std::sync::Arc;

use napi::bindgen_prelude::AsyncTask;
use napi::{Env, Task};
use serde_json::Value;

use super::Compiler;

/// JavaScript face of [`Compiler`]. Compilation runs on the libuv thread pool and settles a
/// Promise with the `{output, errors}` envelope.
#[napi(js_name = "SolcNative")]
pub struct JsSolcNative {
  inner: Arc<Compiler>,
}

#[napi]
impl JsSolcNative {
  #[napi(constructor, ts_args_type = "solcPath?: string | undefined")]
  pub fn new(solc_path: Option<String>) -> Self {
    let compiler = match solc_path {
      Some(path) if !path.is_empty() => Compiler::from_path(path),
      _ => Compiler::default(),
    };
    Self {
      inner: Arc::new(compiler),
    }
  }

  #[napi]
  pub fn version(&self) -> String {
    self.inner.version()
  }

  #[napi(
    ts_args_type = "request: { files: string | string[]; optimize?: boolean; optimize_runs?: number }",
    ts_return_type = "Promise<CompileResult>"
  )]
  pub fn compile(&self, request: Value) -> AsyncTask<CompileTask> {
    AsyncTask::new(CompileTask {
      compiler: Arc::clone(&self.inner),
      request,
    })
  }
}

pub struct CompileTask {
  compiler: Arc<Compiler>,
  request: Value,
}

impl Task for CompileTask {
  type Output = Value;
  type JsValue = Value;

  fn compute(&mut self) -> napi::Result<Self::Output> {
    let result = self.compiler.compile_value(&self.request)?;
    serde_json::to_value(result).map_err(|err| napi::Error::from(crate::Error::from(err)))
  }

  fn resolve(&mut self, _env: Env, output: Self::Output) -> napi::Result<Self::JsValue> {
    Ok(output)
  }
}
