//! Subprocess execution for synthesized command lines.
//!
//! The command synthesis engine produces fully quoted command strings, so
//! execution goes through the platform shell rather than argv splitting.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};

/// A single shell-evaluated command line.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    line: String,
    cwd: Option<PathBuf>,
}

impl ShellCommand {
    /// Create a new shell command from a complete command line.
    pub fn new(line: impl Into<String>) -> Self {
        ShellCommand {
            line: line.into(),
            cwd: None,
        }
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the command line.
    pub fn line(&self) -> &str {
        &self.line
    }

    fn build_command(&self) -> Command {
        #[cfg(windows)]
        let mut cmd = {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.line);
            c
        };

        #[cfg(not(windows))]
        let mut cmd = {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.line);
            c
        };

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion, capturing output.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.output()
            .with_context(|| format!("failed to spawn `{}`", self.line))
    }
}

/// The program name of a command line: the first token, honoring a quoted
/// leading executable.
pub fn program_name(line: &str) -> &str {
    let line = line.trim_start();
    if let Some(rest) = line.strip_prefix('"') {
        match rest.find('"') {
            Some(end) => &rest[..end],
            None => rest,
        }
    } else {
        line.split_whitespace().next().unwrap_or("")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_command_captures_output() {
        let output = ShellCommand::new("echo hello").exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[test]
    fn test_shell_command_failure_status() {
        let output = ShellCommand::new("exit 3").exec().unwrap();
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn test_program_name_plain() {
        assert_eq!(program_name("gcc -c -o m.o m.c"), "gcc");
    }

    #[test]
    fn test_program_name_quoted() {
        assert_eq!(
            program_name("\"C:/tools/clang cl.exe\" /nologo /c m.c"),
            "C:/tools/clang cl.exe"
        );
    }
}
