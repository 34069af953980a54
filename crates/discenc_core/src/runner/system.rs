//! Tool runner backed by `std::process`.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};

use super::types::{ToolCommand, ToolError, ToolOutput, ToolResult};
use super::{ChildProcess, ToolRunner};

/// Runs tools as real child processes.
///
/// Executables are resolved on PATH right before each spawn, so a missing
/// tool only fails the job that needs it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(&self, cmd: &ToolCommand) -> ToolResult<Command> {
        let resolved =
            which::which(cmd.program()).map_err(|_| ToolError::not_found(cmd.program()))?;

        let mut command = Command::new(resolved);
        command.args(cmd.arg_list());
        if let Some(dir) = cmd.working_dir() {
            command.current_dir(dir);
        }
        Ok(command)
    }
}

impl ToolRunner for SystemRunner {
    fn output(&self, cmd: &ToolCommand) -> ToolResult<ToolOutput> {
        tracing::debug!("Running: {}", cmd.display());

        let output = self
            .command(cmd)?
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ToolError::spawn_failed(cmd.program(), e))?;

        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn spawn(&self, cmd: &ToolCommand) -> ToolResult<Box<dyn ChildProcess>> {
        tracing::debug!("Spawning: {}", cmd.display());

        let child = self
            .command(cmd)?
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolError::spawn_failed(cmd.program(), e))?;

        Ok(Box::new(SystemChild {
            tool: cmd.program().to_string(),
            child,
        }))
    }
}

struct SystemChild {
    tool: String,
    child: Child,
}

impl ChildProcess for SystemChild {
    fn write_stdin(&mut self, data: &[u8]) -> ToolResult<()> {
        let stdin = self.child.stdin.as_mut().ok_or_else(|| {
            ToolError::io(
                format!("writing to {} stdin", self.tool),
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin closed"),
            )
        })?;
        stdin
            .write_all(data)
            .and_then(|_| stdin.flush())
            .map_err(|e| ToolError::io(format!("writing to {} stdin", self.tool), e))
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn terminate(&mut self) -> ToolResult<()> {
        match self.child.kill() {
            Ok(()) => Ok(()),
            // Already exited
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(ToolError::io(format!("terminating {}", self.tool), e)),
        }
    }

    fn try_wait(&mut self) -> ToolResult<Option<i32>> {
        self.child
            .try_wait()
            .map(|status| status.map(|s| s.code().unwrap_or(-1)))
            .map_err(|e| ToolError::io(format!("polling {}", self.tool), e))
    }

    fn wait(&mut self) -> ToolResult<i32> {
        self.child
            .wait()
            .map(|s| s.code().unwrap_or(-1))
            .map_err(|e| ToolError::io(format!("waiting for {}", self.tool), e))
    }
}
