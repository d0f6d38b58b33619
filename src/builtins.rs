use std::{
    env,
    ffi::OsString,
    path::PathBuf,
};

use log::debug;

use crate::error::DirectoryError;

/// Commands executed inside the interpreter, never forked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Cd,
    Status,
}

impl Builtin {
    /// Exact, case-sensitive match on the program name.
    pub fn lookup(program: &str) -> Option<Self> {
        match program {
            "exit" => Some(Builtin::Exit),
            "cd" => Some(Builtin::Cd),
            "status" => Some(Builtin::Status),
            _ => None,
        }
    }
}

/// Changes the working directory. No argument means `$HOME`.
pub fn cd(args: &[String]) -> Result<PathBuf, DirectoryError> {
    let path = cd_target(args, env::var_os("HOME"))?;
    env::set_current_dir(&path).map_err(|source| DirectoryError::Change {
        path: path.clone(),
        source,
    })?;
    debug!("cwd is now {}", path.display());
    Ok(path)
}

fn cd_target(args: &[String], home: Option<OsString>) -> Result<PathBuf, DirectoryError> {
    match args {
        [] => home
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .ok_or(DirectoryError::NoHome),
        [path] => Ok(PathBuf::from(path)),
        _ => Err(DirectoryError::TooManyArguments(args.len())),
    }
}
