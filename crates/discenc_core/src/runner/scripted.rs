//! Scripted tool runner for tests.
//!
//! Records every invocation and replays canned output per program.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use parking_lot::Mutex;

use super::types::{ToolCommand, ToolError, ToolOutput, ToolResult};
use super::{ChildProcess, ToolRunner};

/// Canned result of one invocation.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponse {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: i32,
    /// `try_wait` on the spawned child returns an error.
    pub fail_try_wait: bool,
    /// `terminate` on the spawned child returns an error.
    pub fail_terminate: bool,
}

impl ScriptedResponse {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn stdout<S: Into<String>>(mut self, lines: impl IntoIterator<Item = S>) -> Self {
        self.stdout = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn stderr<S: Into<String>>(mut self, lines: impl IntoIterator<Item = S>) -> Self {
        self.stderr = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn fail_try_wait(mut self) -> Self {
        self.fail_try_wait = true;
        self
    }

    pub fn fail_terminate(mut self) -> Self {
        self.fail_terminate = true;
        self
    }

    fn joined(lines: &[String]) -> String {
        lines.iter().map(|l| format!("{}\n", l)).collect()
    }
}

#[derive(Default)]
struct ScriptState {
    responses: HashMap<String, VecDeque<ScriptedResponse>>,
    missing: HashSet<String>,
    calls: Vec<ToolCommand>,
    stdin: Vec<u8>,
    terminations: usize,
    closed_pipes: usize,
}

/// Runner that never starts a process.
///
/// Programs without a scripted response succeed with empty output.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next invocation of `program`.
    pub fn respond(&self, program: &str, response: ScriptedResponse) -> &Self {
        self.state
            .lock()
            .responses
            .entry(program.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Make `program` unresolvable.
    pub fn missing(&self, program: &str) -> &Self {
        self.state.lock().missing.insert(program.to_string());
        self
    }

    /// All recorded invocations in order.
    pub fn calls(&self) -> Vec<ToolCommand> {
        self.state.lock().calls.clone()
    }

    /// Recorded invocations of one program.
    pub fn calls_to(&self, program: &str) -> Vec<ToolCommand> {
        self.calls()
            .into_iter()
            .filter(|c| c.program() == program)
            .collect()
    }

    pub fn terminations(&self) -> usize {
        self.state.lock().terminations
    }

    /// Child output pipes dropped so far.
    pub fn closed_pipes(&self) -> usize {
        self.state.lock().closed_pipes
    }

    pub fn stdin_bytes(&self) -> Vec<u8> {
        self.state.lock().stdin.clone()
    }

    fn next_response(&self, cmd: &ToolCommand) -> ToolResult<ScriptedResponse> {
        let mut state = self.state.lock();
        if state.missing.contains(cmd.program()) {
            return Err(ToolError::not_found(cmd.program()));
        }
        state.calls.push(cmd.clone());
        Ok(state
            .responses
            .get_mut(cmd.program())
            .and_then(VecDeque::pop_front)
            .unwrap_or_default())
    }
}

impl ToolRunner for ScriptedRunner {
    fn output(&self, cmd: &ToolCommand) -> ToolResult<ToolOutput> {
        let response = self.next_response(cmd)?;
        Ok(ToolOutput {
            exit_code: Some(response.exit_code),
            stdout: ScriptedResponse::joined(&response.stdout),
            stderr: ScriptedResponse::joined(&response.stderr),
        })
    }

    fn spawn(&self, cmd: &ToolCommand) -> ToolResult<Box<dyn ChildProcess>> {
        let response = self.next_response(cmd)?;
        Ok(Box::new(ScriptedChild {
            stdout: Some(ScriptedResponse::joined(&response.stdout).into_bytes()),
            stderr: Some(ScriptedResponse::joined(&response.stderr).into_bytes()),
            exit_code: response.exit_code,
            fail_try_wait: response.fail_try_wait,
            fail_terminate: response.fail_terminate,
            state: Arc::clone(&self.state),
        }))
    }
}

struct ScriptedChild {
    stdout: Option<Vec<u8>>,
    stderr: Option<Vec<u8>>,
    exit_code: i32,
    fail_try_wait: bool,
    fail_terminate: bool,
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedChild {
    fn pipe(&self, bytes: Vec<u8>) -> Box<dyn Read + Send> {
        Box::new(ScriptedPipe {
            inner: Cursor::new(bytes),
            state: Arc::clone(&self.state),
        })
    }
}

/// Output pipe that counts itself closed when dropped.
struct ScriptedPipe {
    inner: Cursor<Vec<u8>>,
    state: Arc<Mutex<ScriptState>>,
}

impl Read for ScriptedPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for ScriptedPipe {
    fn drop(&mut self) {
        self.state.lock().closed_pipes += 1;
    }
}

impl ChildProcess for ScriptedChild {
    fn write_stdin(&mut self, data: &[u8]) -> ToolResult<()> {
        self.state.lock().stdin.extend_from_slice(data);
        Ok(())
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        let bytes = self.stdout.take()?;
        Some(self.pipe(bytes))
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        let bytes = self.stderr.take()?;
        Some(self.pipe(bytes))
    }

    fn terminate(&mut self) -> ToolResult<()> {
        self.state.lock().terminations += 1;
        if self.fail_terminate {
            return Err(ToolError::io(
                "terminating child",
                io::Error::new(io::ErrorKind::PermissionDenied, "scripted failure"),
            ));
        }
        self.exit_code = -1;
        Ok(())
    }

    fn try_wait(&mut self) -> ToolResult<Option<i32>> {
        if self.fail_try_wait {
            return Err(ToolError::io(
                "polling child",
                io::Error::new(io::ErrorKind::Other, "scripted failure"),
            ));
        }
        Ok(Some(self.exit_code))
    }

    fn wait(&mut self) -> ToolResult<i32> {
        Ok(self.exit_code)
    }
}
