use std::{io, path::PathBuf};

use nix::{errno::Errno, unistd::Pid};
use thiserror::Error;

/// Malformed command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing redirection target after `{operator}`")]
    MissingRedirectTarget { operator: &'static str },
    #[error("no command given")]
    EmptyCommand,
}

/// Failures of the `cd` built-in.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("cd: too many arguments ({0})")]
    TooManyArguments(usize),
    #[error("cd: HOME is not set")]
    NoHome,
    #[error("cd: {}: {source}", .path.display())]
    Change { path: PathBuf, source: io::Error },
}

/// Errors raised between `fork` and `exec`. They are reported by the child
/// and turned into exit status 1; the parent only ever sees that status.
#[derive(Debug, Error)]
pub enum ChildError {
    #[error("{path}: cannot open for {stream}: {source}")]
    Redirect {
        path: String,
        stream: &'static str,
        source: Errno,
    },
    #[error("{program}: {source}")]
    Exec { program: String, source: Errno },
    #[error("signal setup failed: {0}")]
    Signals(Errno),
}

/// Errors surfaced to the read loop.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("fork failed: {0}")]
    Spawn(Errno),
    #[error("waiting for pid {pid} failed: {source}")]
    Wait { pid: Pid, source: Errno },
    #[error("signal setup failed: {0}")]
    Signals(Errno),
    #[error("background registry is full ({capacity} processes), command not started")]
    RegistryFull { capacity: usize },
    #[error("argument contains a NUL byte")]
    NulByte(#[from] std::ffi::NulError),
}

impl ShellError {
    /// Errors after which the interpreter cannot keep running.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::Spawn(_) | ShellError::Wait { .. } | ShellError::Signals(_)
        )
    }
}
