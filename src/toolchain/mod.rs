// Wasabi64 - A makerom-style ROM image builder for the Nintendo 64
// Copyright (C) 2026  Wasabi64 contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! External toolchain integration.
//!
//! Each stage of the build shells out to one program of a MIPS toolchain:
//! the preprocessor, the assembler, the linker, and objcopy. [`Runner`]
//! wraps a single program; the [`Toolchain`] trait exposes the four build
//! collaborators so the pipeline can be tested against fakes without
//! spawning anything.

mod stages;

pub use stages::{wrapped_object_name, CommandToolchain, Toolchain};

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use thiserror::Error;

/// Errors from invoking external toolchain programs.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program is neither an existing path nor findable in PATH.
    #[error("toolchain program '{0}' not found in PATH")]
    NotFound(String),

    /// The program could not be spawned.
    #[error("failed to start '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    /// I/O towards the running program failed.
    #[error("i/o error running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The program exited with a non-zero status.
    #[error("'{command}' failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The program succeeded but its output was not usable.
    #[error("'{command}' produced invalid output: {message}")]
    MalformedOutput { command: String, message: String },

    /// A scratch file for an intermediate artifact failed.
    #[error("scratch file error: {0}")]
    Scratch(#[source] io::Error),
}

/// Resolve a configured command name to a runnable path.
///
/// Absolute or relative paths that exist are used as given; bare names are
/// looked up in PATH.
pub fn find_tool(command: &str) -> Result<PathBuf, ToolError> {
    let as_path = Path::new(command);
    if as_path.components().count() > 1 || as_path.exists() {
        return Ok(as_path.to_path_buf());
    }
    which::which(command).map_err(|_| ToolError::NotFound(command.to_string()))
}

/// One external program, invoked with stage-specific arguments.
///
/// `run` blocks until the program exits; there is no timeout. Stdout is
/// captured and returned, stderr is captured for diagnostics, and a
/// non-zero exit is an error.
#[derive(Debug, Clone)]
pub struct Runner {
    command: PathBuf,
}

impl Runner {
    /// Wrap a program path without checking it exists; spawn failures
    /// surface on first use.
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Resolve `command` via [`find_tool`] and wrap it.
    pub fn resolve(command: &str) -> Result<Self, ToolError> {
        Ok(Self::new(find_tool(command)?))
    }

    /// The wrapped program path.
    pub fn command(&self) -> &Path {
        &self.command
    }

    fn name(&self) -> String {
        self.command.display().to_string()
    }

    /// Run the program with `args`, optionally feeding `input` on stdin,
    /// and return captured stdout.
    pub fn run<S: AsRef<std::ffi::OsStr>>(
        &self,
        args: &[S],
        input: Option<&[u8]>,
    ) -> Result<Vec<u8>, ToolError> {
        let mut child = Command::new(&self.command)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolError::SpawnFailed {
                command: self.name(),
                source: e,
            })?;

        // Feed stdin from its own thread while wait_with_output drains
        // stdout and stderr. Writing inline deadlocks once the payload and
        // the child's output both exceed the pipe buffers: the child
        // blocks on a full stdout pipe and stops reading stdin.
        let writer = input.map(|bytes| {
            let mut stdin = child.stdin.take().expect("stdin was piped");
            let bytes = bytes.to_vec();
            // Dropping stdin closes the pipe so the child sees EOF.
            thread::spawn(move || stdin.write_all(&bytes))
        });

        let output = child.wait_with_output().map_err(|e| ToolError::Io {
            command: self.name(),
            source: e,
        })?;

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                // The child may exit without draining stdin; its exit
                // status tells the real story.
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => {
                    return Err(ToolError::Io {
                        command: self.name(),
                        source: e,
                    })
                }
                Err(_) => {
                    return Err(ToolError::Io {
                        command: self.name(),
                        source: io::Error::other("stdin writer thread panicked"),
                    })
                }
            }
        }

        if !output.status.success() {
            return Err(ToolError::Failed {
                command: self.name(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tool_accepts_existing_path() {
        let path = find_tool("/bin/sh").unwrap();
        assert_eq!(path, PathBuf::from("/bin/sh"));
    }

    #[test]
    fn test_find_tool_rejects_missing_name() {
        let err = find_tool("definitely-not-a-real-tool-9921").unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn test_run_captures_stdout() {
        let runner = Runner::resolve("echo").unwrap();
        let out = runner.run(&["hello"], None).unwrap();
        assert_eq!(out, b"hello\n");
    }

    #[test]
    fn test_run_feeds_stdin() {
        let runner = Runner::resolve("cat").unwrap();
        let out = runner.run::<&str>(&[], Some(b"payload")).unwrap();
        assert_eq!(out, b"payload");
    }

    #[test]
    fn test_run_stdin_larger_than_pipe_buffers() {
        // A payload well past the ~64 KiB pipe capacity, echoed straight
        // back: completes only if stdin is written while stdout drains.
        let runner = Runner::resolve("cat").unwrap();
        let payload = vec![0x5A; 1 << 20];
        let out = runner.run::<&str>(&[], Some(&payload)).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn test_run_child_ignoring_stdin_succeeds() {
        // The child exits without reading stdin; the resulting broken
        // pipe must not mask a successful run.
        let runner = Runner::resolve("true").unwrap();
        let payload = vec![0x5A; 1 << 20];
        runner.run::<&str>(&[], Some(&payload)).unwrap();
    }

    #[test]
    fn test_run_nonzero_exit_is_error() {
        let runner = Runner::resolve("false").unwrap();
        let err = runner.run::<&str>(&[], None).unwrap_err();
        assert!(matches!(err, ToolError::Failed { .. }));
    }

    #[test]
    fn test_run_spawn_failure_is_error() {
        let runner = Runner::new("/nonexistent/tool");
        let err = runner.run::<&str>(&[], None).unwrap_err();
        assert!(matches!(err, ToolError::SpawnFailed { .. }));
    }
}
