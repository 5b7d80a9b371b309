#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use semver::Version;
use serde_json::{json, Value};
use tempfile::TempDir;

use super::*;
use crate::internal::config::InvocationMode;

const VERSION: &str = "0.4.24+commit.e67f0147.Linux.g++";
const BYTECODE: &str = "6080604052348015600f57600080fd5b50603580601d6000396000f3";

/// Temporary directory holding Solidity sources, canned compiler responses and a fake `solc`
/// script that logs what it was asked to do.
struct Workspace {
  dir: TempDir,
}

impl Workspace {
  fn new() -> Self {
    Self {
      dir: tempfile::tempdir().expect("tempdir"),
    }
  }

  fn path(&self, name: &str) -> PathBuf {
    self.dir.path().join(name)
  }

  fn source(&self, name: &str) -> PathBuf {
    let path = self.path(name);
    fs::write(&path, "pragma solidity ^0.4.24;\n").expect("write source");
    path
  }

  fn response(&self, name: &str, body: &str) {
    fs::write(self.path(name), body).expect("write response");
  }

  /// A fake compiler answering `--version` and replying to standard-JSON input with the response
  /// file of the first route whose source identifier appears in the input.
  fn solc(&self, routes: &[(&str, &str)], fallback: Option<&str>) -> PathBuf {
    let mut cases = String::new();
    for (identifier, response) in routes {
      cases.push_str(&format!(
        "  *'\"{identifier}\"'*) cat \"$dir/{response}\" ;;\n"
      ));
    }
    if let Some(response) = fallback {
      cases.push_str(&format!("  *) cat \"$dir/{response}\" ;;\n"));
    }
    self.script(&format!("case \"$input\" in\n{cases}esac\n"))
  }

  fn script(&self, body: &str) -> PathBuf {
    let dir = self.dir.path().display();
    let script = format!(
      "#!/bin/sh\n\
       dir='{dir}'\n\
       if [ \"$1\" = \"--version\" ]; then\n\
       \x20 echo called >> \"$dir/version.log\"\n\
       \x20 printf 'solc, the solidity compiler commandline interface\\r\\nVersion: {VERSION}\\r\\n'\n\
       \x20 exit 0\n\
       fi\n\
       printf '%s\\n' \"$*\" >> \"$dir/args.log\"\n\
       pwd -P >> \"$dir/cwd.log\"\n\
       input=$(cat)\n\
       printf '%s\\n' \"$input\" >> \"$dir/input.log\"\n\
       {body}"
    );
    let path = self.path("solc");
    fs::write(&path, script).expect("write fake solc");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake solc");
    path
  }

  fn log(&self, name: &str) -> Vec<String> {
    fs::read_to_string(self.path(name))
      .map(|contents| contents.lines().map(str::to_owned).collect())
      .unwrap_or_default()
  }

  fn inputs(&self) -> Vec<Value> {
    self
      .log("input.log")
      .iter()
      .map(|line| serde_json::from_str(line).expect("input document"))
      .collect()
  }
}

fn metadata(abi: Value) -> String {
  json!({
    "compiler": { "version": "0.4.24+commit.e67f0147" },
    "language": "Solidity",
    "output": {
      "abi": abi,
      "devdoc": { "methods": {} },
      "userdoc": { "methods": {} }
    },
    "version": 1
  })
  .to_string()
}

fn contract(bytecode: &str) -> Value {
  json!({
    "metadata": metadata(json!([{ "type": "function", "name": "total", "inputs": [], "outputs": [] }])),
    "evm": {
      "bytecode": {
        "object": bytecode,
        "linkReferences": {},
        "sourceMap": "26:80:0:-;;;;;;;;"
      }
    }
  })
}

fn warning(file: &str) -> Value {
  json!({
    "component": "general",
    "formattedMessage": format!("{file}:3:5: Warning: Unused local variable.\n"),
    "message": "Unused local variable.",
    "severity": "warning",
    "type": "Warning",
    "sourceLocation": { "file": file, "start": 40, "end": 46 }
  })
}

fn shared_warning() -> Value {
  json!({
    "component": "general",
    "formattedMessage": "Warning: This is a pre-release compiler version.\n",
    "message": "This is a pre-release compiler version.",
    "severity": "warning",
    "type": "Warning",
    "sourceLocation": { "file": "", "start": -1, "end": -1 }
  })
}

fn single_contract_output(file: &str, name: &str) -> String {
  json!({
    "contracts": { file: { name: contract(BYTECODE) } },
    "errors": [warning(file)],
    "sources": { file: { "id": 0 } }
  })
  .to_string()
}

fn token_workspace() -> (Workspace, PathBuf, Compiler) {
  let workspace = Workspace::new();
  let file = workspace.source("Token.sol");
  workspace.response("token.json", &single_contract_output("Token.sol", "Token"));
  let solc = workspace.solc(&[("Token.sol", "token.json")], None);
  (workspace, file, Compiler::from_path(solc))
}

#[test]
fn compiles_single_file_into_artifacts() {
  let (workspace, file, compiler) = token_workspace();
  let result = compiler
    .compile(&CompileRequest::file(&file))
    .expect("compile");

  let artifact = result.artifact("Token").expect("Token artifact");
  assert_eq!(artifact.contract_name, "Token");
  assert_eq!(artifact.source_path, "Token.sol");
  assert_eq!(
    artifact.compiler,
    CompilerInfo {
      name: "solc".to_string(),
      version: "0.4.24+commit.e67f0147".to_string(),
    }
  );
  assert_eq!(artifact.bytecode, BYTECODE);
  assert_eq!(artifact.abi[0]["name"], json!("total"));
  assert_eq!(artifact.source_map.as_deref(), Some("26:80:0:-;;;;;;;;"));
  assert!(artifact.devdoc.is_some());
  assert!(artifact.is_linked());

  assert_eq!(result.errors.len(), 1);
  assert_eq!(result.errors[0].severity, Severity::Warning);
  assert_eq!(
    result.errors[0].source,
    Some(DiagnosticSource {
      file: "Token.sol".to_string(),
      offset: Some(40),
    })
  );
  assert!(!result.has_errors());

  assert_eq!(workspace.log("args.log"), vec!["--standard-json --allow-paths /"]);
  let parent = fs::canonicalize(workspace.dir.path()).expect("canonical tempdir");
  assert_eq!(workspace.log("cwd.log"), vec![parent.display().to_string()]);
}

#[test]
fn input_document_carries_optimizer_and_source() {
  let (workspace, file, compiler) = token_workspace();
  compiler
    .compile_value(&json!({
      "files": [file.display().to_string()],
      "optimize": true,
      "optimize_runs": 200
    }))
    .expect("compile");

  let inputs = workspace.inputs();
  assert_eq!(inputs.len(), 1);
  let input = &inputs[0];
  assert_eq!(input["language"], json!("Solidity"));
  assert_eq!(
    input["sources"],
    json!({ "Token.sol": { "urls": [file.display().to_string()] } })
  );
  assert_eq!(
    input["settings"]["optimizer"],
    json!({ "enabled": true, "runs": 200 })
  );
  assert_eq!(input["settings"]["evmVersion"], json!("byzantium"));
  assert_eq!(
    input["settings"]["metadata"],
    json!({ "useLiteralContent": true })
  );
  assert_eq!(
    input["settings"]["outputSelection"],
    json!({ "*": { "*": ["metadata", "evm.bytecode", "evm.bytecode.sourceMap", "legacyAST"] } })
  );

  let planned = compiler
    .input_documents(&CompileRequest::file(&file).optimize(true).optimize_runs(200))
    .expect("plan");
  assert_eq!(serde_json::to_value(&planned[0]).expect("value"), *input);
}

#[test]
fn multiple_files_merge_and_deduplicate_diagnostics() {
  let workspace = Workspace::new();
  let token = workspace.source("Token.sol");
  let math = workspace.source("Math.sol");
  workspace.response(
    "token.json",
    &json!({
      "contracts": { "Token.sol": { "Token": contract(BYTECODE) } },
      "errors": [shared_warning(), warning("Token.sol")]
    })
    .to_string(),
  );
  workspace.response(
    "math.json",
    &json!({
      "contracts": {
        "Math.sol": {
          "Math": contract("6060"),
          "IMath": contract("")
        }
      },
      "errors": [shared_warning(), warning("Math.sol")]
    })
    .to_string(),
  );
  let solc = workspace.solc(&[("Token.sol", "token.json"), ("Math.sol", "math.json")], None);

  let result = Compiler::from_path(solc)
    .compile(&CompileRequest::new([&token, &math]))
    .expect("compile");

  let names: Vec<_> = result.output.keys().cloned().collect();
  assert_eq!(names, vec!["Math", "Token"]);
  let messages: Vec<_> = result
    .errors
    .iter()
    .map(|diagnostic| diagnostic.message.lines().next().unwrap_or_default().to_owned())
    .collect();
  assert_eq!(
    messages,
    vec![
      "Warning: This is a pre-release compiler version.",
      "Token.sol:3:5: Warning: Unused local variable.",
      "Math.sol:3:5: Warning: Unused local variable.",
    ]
  );
  assert_eq!(workspace.log("args.log").len(), 2);
}

#[test]
fn later_files_replace_same_named_contracts() {
  let workspace = Workspace::new();
  let first = workspace.source("First.sol");
  let second = workspace.source("Second.sol");
  workspace.response("first.json", &single_contract_output("First.sol", "Shared"));
  workspace.response("second.json", &single_contract_output("Second.sol", "Shared"));
  let solc = workspace.solc(
    &[("First.sol", "first.json"), ("Second.sol", "second.json")],
    None,
  );

  let result = Compiler::from_path(solc)
    .compile(&CompileRequest::new([&first, &second]))
    .expect("compile");
  assert_eq!(result.output.len(), 1);
  assert_eq!(result.output["Shared"].source_path, "Second.sol");
}

#[test]
fn batch_mode_runs_once_with_absolute_identifiers() {
  let workspace = Workspace::new();
  let token = workspace.source("Token.sol");
  let math = workspace.source("Math.sol");
  workspace.response(
    "batch.json",
    &json!({
      "contracts": {
        token.display().to_string(): { "Token": contract(BYTECODE) },
        math.display().to_string(): { "Math": contract("6060") }
      }
    })
    .to_string(),
  );
  let solc = workspace.solc(&[], Some("batch.json"));
  let compiler = Compiler::new(Some(CompilerConfigOptions {
    solc_path: Some(solc),
    invocation: Some(InvocationMode::Batch),
    ..CompilerConfigOptions::default()
  }));

  let result = compiler
    .compile(&CompileRequest::new([&token, &math]))
    .expect("compile");
  assert_eq!(result.output.len(), 2);
  assert_eq!(result.output["Token"].source_path, token.display().to_string());

  let inputs = workspace.inputs();
  assert_eq!(inputs.len(), 1);
  let mut keys: Vec<_> = inputs[0]["sources"]
    .as_object()
    .expect("sources")
    .keys()
    .cloned()
    .collect();
  keys.sort();
  let mut expected = vec![token.display().to_string(), math.display().to_string()];
  expected.sort();
  assert_eq!(keys, expected);
  assert_eq!(workspace.log("args.log"), vec!["--standard-json --allow-paths /"]);
}

#[test]
fn invalid_requests_never_spawn_the_compiler() {
  let (workspace, file, compiler) = token_workspace();

  let negative = compiler.compile(&CompileRequest::file(&file).optimize(true).optimize_runs(-1));
  assert!(matches!(negative, Err(Error::InvalidOptimizerRuns(_))));

  let fractional = compiler.compile_value(&json!({
    "files": file.display().to_string(),
    "optimize_runs": 1.5
  }));
  assert!(matches!(fractional, Err(Error::InvalidOptimizerRuns(_))));

  let relative = compiler.compile(&CompileRequest::file("contracts/Token.sol"));
  assert!(matches!(relative, Err(Error::InvalidInputPath { .. })));

  let not_an_object = compiler.compile_value(&json!("Token.sol"));
  assert!(matches!(not_an_object, Err(Error::InvalidRequest(_))));

  assert!(workspace.log("args.log").is_empty());
}

#[test]
fn validation_precedes_launch() {
  let workspace = Workspace::new();
  let compiler = Compiler::from_path(workspace.path("missing-solc"));
  let err = compiler
    .compile(&CompileRequest::file("relative.sol").optimize_runs(-1))
    .expect_err("invalid runs");
  assert!(matches!(err, Error::InvalidOptimizerRuns(_)));
}

#[test]
fn empty_or_garbled_stdout_is_unreadable() {
  for body in ["", "printf 'Segmentation fault\\n'\n"] {
    let workspace = Workspace::new();
    let file = workspace.source("Token.sol");
    let solc = workspace.script(body);
    let err = Compiler::from_path(solc)
      .compile(&CompileRequest::file(&file))
      .expect_err("unreadable output");
    assert!(
      matches!(err, Error::CompilerOutputUnreadable { .. }),
      "{err:?}"
    );
    assert_eq!(err.files(), [file.clone()]);
    assert!(err.to_string().contains("Token.sol"));
  }
}

#[test]
fn metadata_without_abi_is_malformed() {
  let workspace = Workspace::new();
  let file = workspace.source("Token.sol");
  workspace.response(
    "token.json",
    &json!({
      "contracts": {
        "Token.sol": {
          "Token": {
            "metadata": json!({ "compiler": { "version": "0.4.24" }, "output": {} }).to_string(),
            "evm": { "bytecode": { "object": BYTECODE } }
          }
        }
      }
    })
    .to_string(),
  );
  let solc = workspace.solc(&[("Token.sol", "token.json")], None);

  let err = Compiler::from_path(solc)
    .compile(&CompileRequest::file(&file))
    .expect_err("missing abi");
  match err {
    Error::MalformedOutput {
      files, contract, ..
    } => {
      assert_eq!(files, vec![file]);
      assert_eq!(contract.as_deref(), Some("Token"));
    }
    other => panic!("unexpected error: {other:?}"),
  }
}

#[test]
fn unlinked_libraries_get_placeholders() {
  let workspace = Workspace::new();
  let file = workspace.source("Token.sol");
  let bytecode = format!("6060{}6060", "0".repeat(40));
  workspace.response(
    "token.json",
    &json!({
      "contracts": {
        "Token.sol": {
          "Token": {
            "metadata": metadata(json!([])),
            "evm": {
              "bytecode": {
                "object": bytecode,
                "linkReferences": {
                  "Math.sol": { "SafeMath": [{ "start": 2, "length": 20 }] }
                }
              }
            }
          }
        }
      }
    })
    .to_string(),
  );
  let solc = workspace.solc(&[("Token.sol", "token.json")], None);

  let result = Compiler::from_path(solc)
    .compile(&CompileRequest::file(&file))
    .expect("compile");
  let artifact = &result.output["Token"];
  assert_eq!(artifact.bytecode.len(), bytecode.len());
  assert_eq!(
    artifact.bytecode,
    format!("6060{}6060", placeholder_symbol("SafeMath"))
  );
  assert_eq!(artifact.unlinked_libraries(), vec!["SafeMath".to_string()]);
  assert!(artifact.bytecode_bytes().is_none());
}

#[test]
fn exit_status_and_stderr_are_not_errors() {
  let workspace = Workspace::new();
  let file = workspace.source("Token.sol");
  workspace.response("token.json", &single_contract_output("Token.sol", "Token"));
  let solc = workspace.script("cat \"$dir/token.json\"\necho 'internal compiler error' >&2\nexit 3\n");

  let result = Compiler::from_path(solc)
    .compile(&CompileRequest::file(&file))
    .expect("compile");
  assert!(result.artifact("Token").is_some());
}

#[test]
fn compiler_that_ignores_stdin_is_tolerated() {
  let workspace = Workspace::new();
  let file = workspace.source("Token.sol");
  workspace.response("token.json", &single_contract_output("Token.sol", "Token"));
  let path = workspace.path("solc");
  fs::write(&path, format!("#!/bin/sh\ncat '{}'\n", workspace.path("token.json").display()))
    .expect("write fake solc");
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");

  let result = Compiler::from_path(path)
    .compile(&CompileRequest::file(&file))
    .expect("compile");
  assert_eq!(result.output.len(), 1);
}

#[test]
fn missing_binary_fails_to_launch() {
  let workspace = Workspace::new();
  let file = workspace.source("Token.sol");
  let missing = workspace.path("not-solc");
  let compiler = Compiler::from_path(&missing);

  let err = compiler
    .compile(&CompileRequest::file(&file))
    .expect_err("launch failure");
  match err {
    Error::CompilerLaunchFailed { program, .. } => assert_eq!(program, missing),
    other => panic!("unexpected error: {other:?}"),
  }
  assert_eq!(compiler.version(), "");
  assert_eq!(compiler.semantic_version(), None);
}

#[test]
fn version_is_detected_once() {
  let (workspace, _file, compiler) = token_workspace();
  assert_eq!(compiler.version(), VERSION);
  assert_eq!(compiler.version(), VERSION);
  assert_eq!(compiler.semantic_version(), Some(Version::new(0, 4, 24)));
  assert_eq!(workspace.log("version.log").len(), 1);

  let copy = compiler.clone();
  assert_eq!(copy.version(), VERSION);
  assert_eq!(workspace.log("version.log").len(), 1);
}

#[tokio::test]
async fn async_compile_matches_blocking() {
  let (workspace, file, compiler) = token_workspace();
  let request = CompileRequest::file(&file).optimize(true);

  let awaited = compiler.compile_async(&request).await.expect("async compile");
  let blocking = compiler.compile(&request).expect("blocking compile");
  assert_eq!(awaited, blocking);
  assert_eq!(workspace.log("args.log").len(), 2);
}

#[tokio::test]
async fn async_compile_reports_launch_failure() {
  let workspace = Workspace::new();
  let file = workspace.source("Token.sol");
  let err = Compiler::from_path(workspace.path("not-solc"))
    .compile_async(&CompileRequest::file(Path::new(&file)))
    .await
    .expect_err("launch failure");
  assert!(matches!(err, Error::CompilerLaunchFailed { .. }));
}
