//! External tool execution.
//!
//! Every subprocess the pipeline starts (probe, encoder, audio extractor,
//! loudness analyzer, metadata editor) goes through [`ToolRunner`], so the
//! pipeline can be driven by a scripted runner in tests.

mod system;
mod types;

#[cfg(test)]
pub(crate) mod scripted;

use std::io::Read;

pub use system::SystemRunner;
pub use types::{ToolCommand, ToolError, ToolOutput, ToolResult};

/// Capability to run external tools.
pub trait ToolRunner: Send + Sync {
    /// Run a command to completion and capture its output.
    fn output(&self, cmd: &ToolCommand) -> ToolResult<ToolOutput>;

    /// Start a command with piped stdin, stdout and stderr.
    fn spawn(&self, cmd: &ToolCommand) -> ToolResult<Box<dyn ChildProcess>>;

    /// Run a command and fail with `CommandFailed` on a non-zero exit.
    fn run_checked(&self, cmd: &ToolCommand) -> ToolResult<ToolOutput> {
        self.output(cmd)?.check(cmd.program())
    }
}

/// A running child process.
pub trait ChildProcess: Send {
    fn write_stdin(&mut self, data: &[u8]) -> ToolResult<()>;

    /// Take the stdout pipe; `None` once taken.
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Take the stderr pipe; `None` once taken.
    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Kill the process. Succeeds if it already exited.
    fn terminate(&mut self) -> ToolResult<()>;

    /// Exit code if the process has finished (`-1` when killed by a signal).
    fn try_wait(&mut self) -> ToolResult<Option<i32>>;

    /// Block until the process exits.
    fn wait(&mut self) -> ToolResult<i32>;
}
