use std::io::Write;

use log::{debug, info};

use crate::{
    builtins::{self, Builtin},
    config::{CdFailure, Config},
    error::ShellError,
    expand::Expander,
    parse::{parse_line, Command},
    process_exec::{Launch, Launcher},
    registry::{BackgroundRegistry, Reaper, WaitReaper},
    signals::SignalPolicy,
    status::Termination,
};

/// What the read loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

/// The command execution engine: one line in, one command out.
pub struct Shell<W: Write> {
    out: W,
    expander: Expander,
    launcher: Launcher,
    registry: BackgroundRegistry,
    last_status: Termination,
    cd_failure: CdFailure,
}

impl<W: Write> Shell<W> {
    pub fn new(config: &Config, policy: SignalPolicy, out: W) -> Self {
        Self {
            out,
            expander: Expander::new(),
            launcher: Launcher::new(policy),
            registry: BackgroundRegistry::new(config.registry_capacity, config.registry_overflow),
            last_status: Termination::default(),
            cd_failure: config.cd_failure,
        }
    }

    #[cfg(test)]
    pub fn last_status(&self) -> Termination {
        self.last_status
    }

    #[cfg(test)]
    pub fn registry(&self) -> &BackgroundRegistry {
        &self.registry
    }

    // Main execution entry point
    pub fn execute(&mut self, line: &str) -> Result<Flow, ShellError> {
        let command = parse_line(line, &self.expander)?;
        match Builtin::lookup(&command.program) {
            Some(builtin) => self.run_builtin(builtin, &command),
            None => {
                self.run_external(&command)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn run_builtin(&mut self, builtin: Builtin, command: &Command) -> Result<Flow, ShellError> {
        debug!("builtin {builtin:?}");
        match builtin {
            Builtin::Exit => Ok(Flow::Exit(0)),
            Builtin::Cd => match builtins::cd(&command.args) {
                Ok(_) => Ok(Flow::Continue),
                Err(e) if self.cd_failure == CdFailure::Exit => {
                    info!("cd failed, exiting: {e}");
                    eprintln!("{e}");
                    Ok(Flow::Exit(1))
                }
                Err(e) => Err(e.into()),
            },
            Builtin::Status => {
                let status = self.last_status;
                match status {
                    Termination::Exited(code) => self.report(format_args!("exit status {code}")),
                    signaled => self.report(format_args!("{signaled}")),
                }
                Ok(Flow::Continue)
            }
        }
    }

    fn run_external(&mut self, command: &Command) -> Result<(), ShellError> {
        match self.launcher.launch(command, &mut self.registry)? {
            Launch::Completed(termination) => {
                self.last_status = termination;
                if let Termination::Signaled(_) = termination {
                    self.report(format_args!("{termination}"));
                }
            }
            Launch::Background(pid) => {
                self.report(format_args!("background pid is {pid}"));
            }
        }
        Ok(())
    }

    /// Reaps finished background processes and reports them.
    pub fn sweep(&mut self) {
        self.sweep_with(&mut WaitReaper);
    }

    fn sweep_with(&mut self, reaper: &mut impl Reaper) {
        for (pid, termination) in self.registry.sweep(reaper) {
            self.report(format_args!("background pid {pid} is done: {termination}"));
        }
    }

    /// Signals every background process before the interpreter exits.
    pub fn shutdown(&mut self) {
        self.registry.terminate_all();
        self.out.flush().ok();
    }

    fn report(&mut self, message: std::fmt::Arguments<'_>) {
        writeln!(self.out, "{message}").ok();
        self.out.flush().ok();
    }
}
