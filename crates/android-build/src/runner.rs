use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::log::BuildLog;

pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Executes one shell script in the current working directory and waits for it.
pub trait CommandRunner: Send + Sync {
    fn run_shell(&self, script: &str) -> Result<ExitStatus>;
}

#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl ShellRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl CommandRunner for ShellRunner {
    fn run_shell(&self, script: &str) -> Result<ExitStatus> {
        tracing::debug!(shell = %self.shell.display(), script, "spawning");
        // stdio is inherited so toolchain output reaches the terminal as-is.
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(script);
        cmd.status().map_err(|e| {
            Error::io(
                format!("failed to spawn {} for '{script}'", self.shell.display()),
                e,
            )
        })
    }
}

/// Logs each script instead of running it.
#[derive(Clone)]
pub struct DryRunRunner {
    log: Arc<dyn BuildLog>,
}

impl DryRunRunner {
    pub fn new(log: Arc<dyn BuildLog>) -> Self {
        Self { log }
    }
}

impl CommandRunner for DryRunRunner {
    fn run_shell(&self, script: &str) -> Result<ExitStatus> {
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "<unknown>".into());
        self.log.info(&format!("DRY-RUN: (cd {cwd}) {script}"));
        Ok(exit_status(0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub script: String,
    pub cwd: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Exit(i32),
    SpawnError,
}

/// Records scripts with the working directory they would have run in.
#[derive(Debug)]
pub struct RecordingRunner {
    outcome: Outcome,
    calls: Mutex<Vec<Invocation>>,
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self {
            outcome: Outcome::Exit(0),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingRunner {
    /// Every script "exits" with `code`.
    pub fn with_exit_code(code: i32) -> Self {
        Self {
            outcome: Outcome::Exit(code),
            ..Self::default()
        }
    }

    /// Every script fails to spawn.
    pub fn failing_spawn() -> Self {
        Self {
            outcome: Outcome::SpawnError,
            ..Self::default()
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.invocations().into_iter().map(|c| c.script).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run_shell(&self, script: &str) -> Result<ExitStatus> {
        let cwd = std::env::current_dir().map_err(|e| Error::io("cwd error", e))?;
        if let Ok(mut g) = self.calls.lock() {
            g.push(Invocation {
                script: script.to_string(),
                cwd,
            });
        }
        match self.outcome {
            Outcome::Exit(code) => Ok(exit_status(code)),
            Outcome::SpawnError => Err(Error::io(
                format!("failed to spawn shell for '{script}'"),
                std::io::Error::new(std::io::ErrorKind::NotFound, "shell not found"),
            )),
        }
    }
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw((code & 0xff) << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}
