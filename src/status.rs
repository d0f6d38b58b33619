use std::fmt;

use nix::sys::wait::WaitStatus;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    Signaled(i32),
}

impl Termination {
    /// Decodes a wait status. `None` for states that are not terminal
    /// (still alive, stopped, continued).
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Termination::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Termination::Signaled(signal as i32)),
            _ => None,
        }
    }
}

impl Default for Termination {
    fn default() -> Self {
        Termination::Exited(0)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exited(code) => write!(f, "exit value {code}"),
            Termination::Signaled(signal) => write!(f, "terminated by signal {signal}"),
        }
    }
}
