//! Scoped child-process invocation.
//!
//! Commands are always spawned from an argument vector, never through a
//! shell. The child is killed if the future awaiting it is dropped, so no
//! process outlives the operation that started it.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

use treeops_core::{Result, TreeOpsError};

/// A program plus arguments, runnable once or many times.
#[derive(Debug, Clone)]
pub struct ScopedCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl ScopedCommand {
    /// Create a command for `program`.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Render as a quoted shell command line, for logs and error messages.
    pub fn render(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| shell_quote(&part.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Spawn, wait for completion and buffer all output.
    pub async fn output(&self) -> Result<ProcessOutput> {
        tracing::debug!(command = %self.render(), "spawning");

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TreeOpsError::io(self.program.to_string_lossy().into_owned(), e))?;

        Ok(ProcessOutput {
            command: self.render(),
            status: output.status,
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run and fail with an aggregated error on a non-zero exit.
    pub async fn run(&self) -> Result<ProcessOutput> {
        let output = self.output().await?;
        if output.success() {
            Ok(output)
        } else {
            Err(output.into_error())
        }
    }
}

/// Buffered result of a finished child process.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Rendered command line.
    pub command: String,
    /// Exit status.
    pub status: ExitStatus,
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

impl ProcessOutput {
    /// Check if the process exited with status 0.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Split stdout on NUL bytes, dropping empty records.
    pub fn nul_records(&self) -> impl Iterator<Item = &[u8]> {
        self.stdout.split(|b| *b == 0).filter(|r| !r.is_empty())
    }

    /// Whether every stderr line reports a permission problem.
    pub fn only_permission_errors(&self) -> bool {
        let mut lines = self
            .stderr
            .lines()
            .filter(|l| !l.trim().is_empty())
            .peekable();
        lines.peek().is_some() && lines.all(|l| l.contains("Permission denied"))
    }

    /// Convert into the aggregated process error.
    pub fn into_error(self) -> TreeOpsError {
        TreeOpsError::Process {
            command: self.command,
            status: self.status.to_string(),
            stderr: self.stderr.trim().to_string(),
        }
    }
}

/// Turn a raw output record into a path, byte-exact on Unix.
#[cfg(unix)]
pub fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

/// Turn a raw output record into a path.
#[cfg(not(unix))]
pub fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Quote a string for a POSIX shell using single quotes.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/tmp/plain"), "/tmp/plain");
        assert_eq!(shell_quote("with space"), "'with space'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    }

    #[test]
    fn test_render() {
        let cmd = ScopedCommand::new("find")
            .arg("/tmp/my dir")
            .args(["-name", "*.txt"]);
        assert_eq!(cmd.render(), "find '/tmp/my dir' -name '*.txt'");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_failure() {
        let ok = ScopedCommand::new("sh").args(["-c", "printf 'a\\0b\\0'"]).run().await.unwrap();
        let records: Vec<_> = ok.nul_records().collect();
        assert_eq!(records, vec![b"a".as_slice(), b"b".as_slice()]);

        let err = ScopedCommand::new("sh")
            .args(["-c", "echo boom >&2; exit 3"])
            .run()
            .await
            .unwrap_err();
        match err {
            TreeOpsError::Process { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
