//! A line-oriented stream to a single agent: a spawned child process with
//! its stdin/stdout wrapped as blocking line I/O, so the match runner stays
//! on a single thread per match with no suspension beyond one read, one
//! write, and process reap.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};

/// One end of the referee<->agent dialogue: read a line the agent sent,
/// write a line to the agent, or shut it down.
pub trait AgentLink {
    fn read_line(&mut self) -> Result<String>;
    fn write_line(&mut self, line: &str) -> Result<()>;
    /// Sends `Quit` and releases the underlying resource. Exit status is not
    /// inspected; `Quit` is a graceful-shutdown hint only.
    fn shutdown(&mut self);
}

/// An agent backed by a spawned child process, communicating over its
/// stdin/stdout. Optionally copies stderr to a message log file or to this
/// process's own stderr.
pub struct ProcessAgent {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    stderr_copier: Option<JoinHandle<()>>,
}

/// What to do with an agent's stderr stream, per the `-msg` flag.
pub enum StderrPolicy {
    Silence,
    PassThrough,
    CaptureTo(std::path::PathBuf),
}

impl ProcessAgent {
    pub fn spawn(command: &str, args: &[String], stderr: StderrPolicy) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args).stdin(Stdio::piped()).stdout(Stdio::piped());
        match stderr {
            StderrPolicy::Silence => {
                cmd.stderr(Stdio::null());
            }
            StderrPolicy::PassThrough => {
                cmd.stderr(Stdio::inherit());
            }
            StderrPolicy::CaptureTo(_) => {
                cmd.stderr(Stdio::piped());
            }
        }
        let mut child = cmd.spawn().with_context(|| format!("failed to spawn agent '{command}'"))?;
        let stdin = child.stdin.take().ok_or_else(|| anyhow!("agent has no stdin"))?;
        let stdout = BufReader::new(child.stdout.take().ok_or_else(|| anyhow!("agent has no stdout"))?);

        let stderr_copier = if let StderrPolicy::CaptureTo(path) = &stderr {
            let mut stderr_stream = child.stderr.take().ok_or_else(|| anyhow!("agent has no stderr"))?;
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("failed to create message log '{}'", path.display()))?;
            Some(thread::spawn(move || {
                let _ = std::io::copy(&mut stderr_stream, &mut file);
            }))
        } else {
            None
        };

        Ok(Self { child, stdin: Some(stdin), stdout, stderr_copier })
    }
}

impl AgentLink for ProcessAgent {
    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line).context("reading from agent stdout")?;
        if n == 0 {
            return Err(anyhow!("agent closed its stdout"));
        }
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| anyhow!("agent stdin already closed"))?;
        stdin.write_all(line.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush().context("writing to agent stdin")?;
        Ok(())
    }

    fn shutdown(&mut self) {
        let _ = self.write_line("Quit");
        // Drop stdin to send EOF so a well-behaved agent can exit on its own.
        self.stdin.take();
        let _ = self.child.wait();
        if let Some(handle) = self.stderr_copier.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
pub struct FakeAgent {
    pub to_read: std::collections::VecDeque<String>,
    pub written: Vec<String>,
    pub fail_after: Option<usize>,
    reads_done: usize,
}

#[cfg(test)]
impl FakeAgent {
    pub fn new(to_read: Vec<&str>) -> Self {
        Self {
            to_read: to_read.into_iter().map(String::from).collect(),
            written: Vec::new(),
            fail_after: None,
            reads_done: 0,
        }
    }
}

#[cfg(test)]
impl AgentLink for FakeAgent {
    fn read_line(&mut self) -> Result<String> {
        self.reads_done += 1;
        if let Some(limit) = self.fail_after {
            if self.reads_done > limit {
                return Err(anyhow!("fake agent exhausted"));
            }
        }
        self.to_read.pop_front().ok_or_else(|| anyhow!("fake agent has no more lines"))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.written.push(line.to_string());
        Ok(())
    }

    fn shutdown(&mut self) {}
}
