//! Subprocess plumbing shared by the patcher, the downloader and the Java probe.

use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// What happens to a child's standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect stdout and stderr into [`ExecOutput`].
    Capture,
    /// Let the child write straight to our terminal.
    Inherit,
    /// Discard everything.
    Silent,
}

/// A fully described external command.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub mode: OutputMode,
}

impl Invocation {
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
            mode: OutputMode::Capture,
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends `<flag><value>`, e.g. `--out=` + a path.
    pub fn flag<S: AsRef<OsStr>>(mut self, flag: &str, value: S) -> Self {
        let mut joined = OsString::from(flag);
        joined.push(value.as_ref());
        self.args.push(joined);
        self
    }

    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the argument at `idx` as lossy UTF-8.
    #[cfg(test)]
    pub fn arg_str(&self, idx: usize) -> Option<String> {
        self.args
            .get(idx)
            .map(|a| a.to_string_lossy().into_owned())
    }

    #[cfg(test)]
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs external commands. Every call blocks the run until the child exits.
#[async_trait]
pub trait Exec: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ExecOutput>;
}

/// [`Exec`] backed by real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExec;

#[async_trait]
impl Exec for SystemExec {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ExecOutput> {
        debug!(
            program = %invocation.program.display(),
            args = ?invocation.args,
            "Running external command"
        );

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());

        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        match invocation.mode {
            OutputMode::Capture => {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Inherit => {
                command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Silent => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        let output = command.output().await?;

        Ok(ExecOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! A recording [`Exec`] for tests.

    use super::*;
    use std::sync::Mutex;

    type Handler = Box<dyn Fn(&Invocation) -> std::io::Result<ExecOutput> + Send + Sync>;

    pub struct FakeExec {
        handler: Handler,
        calls: Mutex<Vec<Invocation>>,
    }

    impl FakeExec {
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&Invocation) -> std::io::Result<ExecOutput> + Send + Sync + 'static,
        {
            Self {
                handler: Box::new(handler),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Exec for FakeExec {
        async fn run(&self, invocation: &Invocation) -> std::io::Result<ExecOutput> {
            self.calls.lock().unwrap().push(invocation.clone());
            (self.handler)(invocation)
        }
    }

    pub fn ok_with_stdout(stdout: &str) -> ExecOutput {
        ExecOutput {
            success: true,
            code: Some(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }

    pub fn failed(code: i32) -> ExecOutput {
        ExecOutput {
            success: false,
            code: Some(code),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_joins_name_and_value() {
        let inv = Invocation::new("java")
            .arg("-jar")
            .flag("--out=", Path::new("/tmp/RV x.apk"));

        assert_eq!(inv.arg_str(1).as_deref(), Some("--out=/tmp/RV x.apk"));
        assert!(inv.has_arg("-jar"));
        assert_eq!(inv.mode, OutputMode::Capture);
    }
}
