use std::{
    ffi::{CStr, CString},
    os::fd::RawFd,
};

use nix::{
    fcntl::{open, OFlag},
    sys::stat::Mode,
    unistd::{close, dup2},
};

use crate::{
    error::{ChildError, ShellError},
    parse::Command,
};

const DISCARD: &CStr = c"/dev/null";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    File(CString),
    Discard,
}

impl Target {
    fn path(&self) -> &CStr {
        match self {
            Target::File(path) => path,
            Target::Discard => DISCARD,
        }
    }
}

/// Stream bindings for one child, resolved in the parent before `fork` so
/// the child only has to open and `dup2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirections {
    stdin: Option<Target>,
    stdout: Option<Target>,
}

impl Redirections {
    /// Explicit targets always apply. A background child gets the null device
    /// for every stream the user left unspecified; a foreground child keeps
    /// the terminal.
    pub fn plan(command: &Command, foreground: bool) -> Result<Self, ShellError> {
        let resolve = |path: &Option<String>| -> Result<Option<Target>, ShellError> {
            Ok(match path {
                Some(path) => Some(Target::File(CString::new(path.as_str())?)),
                None if foreground => None,
                None => Some(Target::Discard),
            })
        };
        Ok(Self {
            stdin: resolve(&command.input)?,
            stdout: resolve(&command.output)?,
        })
    }

    /// Rebinds stdin/stdout. Runs in the child only.
    pub fn apply(&self) -> Result<(), ChildError> {
        if let Some(target) = &self.stdin {
            bind(target, libc::STDIN_FILENO, OFlag::O_RDONLY, Mode::empty(), "input")?;
        }
        if let Some(target) = &self.stdout {
            let flags = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC;
            let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IWGRP;
            bind(target, libc::STDOUT_FILENO, flags, mode, "output")?;
        }
        Ok(())
    }
}

fn bind(
    target: &Target,
    stream: RawFd,
    flags: OFlag,
    mode: Mode,
    name: &'static str,
) -> Result<(), ChildError> {
    let path = target.path();
    let error = |source| ChildError::Redirect {
        path: path.to_string_lossy().into_owned(),
        stream: name,
        source,
    };
    let fd = open(path, flags, mode).map_err(error)?;
    if fd != stream {
        dup2(fd, stream).map_err(error)?;
        close(fd).map_err(error)?;
    }
    Ok(())
}
