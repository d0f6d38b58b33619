use std::{
    ffi::CString,
    io::{self, Write},
    process::exit,
};

use log::debug;
use nix::{
    errno::Errno,
    sys::wait::waitpid,
    unistd::{execvp, fork, ForkResult, Pid},
};

use crate::{
    error::{ChildError, ShellError},
    parse::Command,
    redirect::Redirections,
    registry::BackgroundRegistry,
    signals::SignalPolicy,
    status::Termination,
};

/// Outcome of dispatching an external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Ran in the foreground and was waited for.
    Completed(Termination),
    /// Running in the background and tracked in the registry.
    Background(Pid),
}

/// Forks and executes external programs.
#[derive(Debug, Clone, Copy)]
pub struct Launcher {
    policy: SignalPolicy,
}

impl Launcher {
    pub fn new(policy: SignalPolicy) -> Self {
        Self { policy }
    }

    pub fn launch(
        &self,
        command: &Command,
        registry: &mut BackgroundRegistry,
    ) -> Result<Launch, ShellError> {
        // Read the mode once so parent and child agree on the role.
        let foreground = self.policy.runs_in_foreground(command);
        if !foreground && !registry.has_room() {
            return Err(ShellError::RegistryFull {
                capacity: registry.capacity(),
            });
        }

        let program = CString::new(command.program.as_str())?;
        let argv = command
            .argv()
            .map(CString::new)
            .collect::<Result<Vec<_>, _>>()?;
        let redirections = Redirections::plan(command, foreground)?;

        debug!(
            "dispatching {} ({})",
            command.program,
            if foreground { "foreground" } else { "background" }
        );
        // Buffered output would otherwise be flushed twice.
        io::stdout().flush().ok();

        // SAFETY: the child only sets dispositions, rebinds descriptors and
        // calls exec, or exits.
        match unsafe { fork() }.map_err(ShellError::Spawn)? {
            ForkResult::Child => {
                let err = self.exec_child(foreground, &redirections, &program, &argv);
                eprintln!("{err}");
                exit(1);
            }
            ForkResult::Parent { child } => {
                if foreground {
                    wait_foreground(child).map(Launch::Completed)
                } else {
                    registry.insert(child)?;
                    Ok(Launch::Background(child))
                }
            }
        }
    }

    fn exec_child(
        &self,
        foreground: bool,
        redirections: &Redirections,
        program: &CString,
        argv: &[CString],
    ) -> ChildError {
        if let Err(e) = self.policy.apply_to_child(foreground) {
            return ChildError::Signals(e);
        }
        if let Err(e) = redirections.apply() {
            return e;
        }
        match execvp(program, argv) {
            Ok(never) => match never {},
            Err(source) => ChildError::Exec {
                program: program.to_string_lossy().into_owned(),
                source,
            },
        }
    }
}

/// Blocks until `pid` terminates.
pub fn wait_foreground(pid: Pid) -> Result<Termination, ShellError> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(termination) = Termination::from_wait_status(status) {
                    debug!("foreground pid {pid}: {termination}");
                    return Ok(termination);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(source) => return Err(ShellError::Wait { pid, source }),
        }
    }
}
