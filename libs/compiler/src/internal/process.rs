use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;

/// A single run of an external program: arguments, working directory and an optional payload
/// written to its standard input. Standard input is always closed once the payload is written
/// so the child sees end-of-input.
#[derive(Clone, Debug)]
pub struct ProcessInvocation {
  program: PathBuf,
  args: Vec<OsString>,
  cwd: Option<PathBuf>,
  stdin: Option<Vec<u8>>,
}

/// Captured result of a finished process. `status` is `None` when the child was terminated by a
/// signal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessOutput {
  pub stdout: String,
  pub stderr: String,
  pub status: Option<i32>,
}

impl ProcessOutput {
  fn from_std(output: std::process::Output) -> Self {
    Self {
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
      status: output.status.code(),
    }
  }

  pub fn success(&self) -> bool {
    self.status == Some(0)
  }
}

impl ProcessInvocation {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      stdin: None,
    }
  }

  pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
    self.args.push(arg.as_ref().to_os_string());
    self
  }

  pub fn current_dir(mut self, dir: Option<&Path>) -> Self {
    self.cwd = dir.map(Path::to_path_buf);
    self
  }

  pub fn stdin(mut self, payload: Vec<u8>) -> Self {
    self.stdin = Some(payload);
    self
  }

  pub fn program(&self) -> &Path {
    &self.program
  }

  pub fn args(&self) -> &[OsString] {
    &self.args
  }

  pub fn working_dir(&self) -> Option<&Path> {
    self.cwd.as_deref()
  }

  pub fn payload(&self) -> Option<&[u8]> {
    self.stdin.as_deref()
  }

  /// Run to completion on the calling thread. The payload is fed from a scoped writer thread so
  /// a child that starts writing before it has read all of its input cannot deadlock us.
  pub fn run_blocking(&self) -> io::Result<ProcessOutput> {
    let mut command = StdCommand::new(&self.program);
    command
      .args(&self.args)
      .stdin(self.stdin_mode())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());
    if let Some(dir) = &self.cwd {
      command.current_dir(dir);
    }

    let mut child = command.spawn()?;
    let stdin = child.stdin.take();
    std::thread::scope(|scope| {
      let writer = scope.spawn(move || match (stdin, self.stdin.as_deref()) {
        (Some(mut pipe), Some(payload)) => ignore_broken_pipe(pipe.write_all(payload)),
        _ => Ok(()),
      });
      let output = child.wait_with_output();
      let written = writer
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("stdin writer thread panicked")));
      let output = output?;
      written?;
      Ok(ProcessOutput::from_std(output))
    })
  }

  /// Run to completion without blocking the async runtime. Writing the payload and collecting
  /// the output are driven concurrently.
  pub async fn run(&self) -> io::Result<ProcessOutput> {
    let mut command = TokioCommand::new(&self.program);
    command
      .args(&self.args)
      .stdin(self.stdin_mode())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    if let Some(dir) = &self.cwd {
      command.current_dir(dir);
    }

    let mut child = command.spawn()?;
    let stdin = child.stdin.take();
    let payload = self.stdin.as_deref();
    let write = async move {
      match (stdin, payload) {
        (Some(mut pipe), Some(payload)) => {
          ignore_broken_pipe(pipe.write_all(payload).await)?;
          ignore_broken_pipe(pipe.shutdown().await)
        }
        _ => Ok(()),
      }
    };
    let (written, output) = tokio::join!(write, child.wait_with_output());
    let output = output?;
    written?;
    Ok(ProcessOutput::from_std(output))
  }

  fn stdin_mode(&self) -> Stdio {
    if self.stdin.is_some() {
      Stdio::piped()
    } else {
      Stdio::null()
    }
  }
}

fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
  match result {
    Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
    other => other,
  }
}
