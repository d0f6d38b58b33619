//! Interrupt and suspend handling.
//!
//! The interpreter ignores SIGINT and uses SIGTSTP to toggle foreground-only
//! mode. Children always ignore SIGTSTP; SIGINT is restored to its default
//! only for children that run in the foreground.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::parse::Command;

pub const ENTER_FOREGROUND_ONLY: &[u8] = b"\nEntering foreground-only mode (& is now ignored)\n";
pub const EXIT_FOREGROUND_ONLY: &[u8] = b"\nExiting foreground-only mode\n";

static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

/// Flips the flag and returns the message announcing the new state.
/// Lock-free and allocation-free, safe to call from a signal handler.
pub fn toggle(flag: &AtomicBool) -> &'static [u8] {
    if flag.fetch_xor(true, Ordering::SeqCst) {
        EXIT_FOREGROUND_ONLY
    } else {
        ENTER_FOREGROUND_ONLY
    }
}

extern "C" fn on_suspend(_: libc::c_int) {
    let message = toggle(&FOREGROUND_ONLY);
    // SAFETY: write(2) is async-signal-safe and the buffer is static.
    unsafe {
        libc::write(libc::STDOUT_FILENO, message.as_ptr().cast(), message.len());
    }
}

/// Handle on the process-wide signal state.
#[derive(Debug, Clone, Copy)]
pub struct SignalPolicy {
    flag: &'static AtomicBool,
}

impl SignalPolicy {
    /// Installs the interpreter's dispositions: SIGINT ignored, SIGTSTP
    /// toggling foreground-only mode.
    pub fn install() -> nix::Result<Self> {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        let suspend = SigAction::new(
            SigHandler::Handler(on_suspend),
            SaFlags::SA_RESTART,
            SigSet::all(),
        );
        // SAFETY: the handler only touches an atomic and calls write(2).
        unsafe {
            sigaction(Signal::SIGINT, &ignore)?;
            sigaction(Signal::SIGTSTP, &suspend)?;
        }
        Ok(Self { flag: &FOREGROUND_ONLY })
    }

    /// A policy backed by its own flag, with no handlers installed.
    #[cfg(test)]
    pub fn detached() -> Self {
        Self {
            flag: Box::leak(Box::new(AtomicBool::new(false))),
        }
    }

    pub fn foreground_only(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn toggle(&self) -> &'static [u8] {
        toggle(self.flag)
    }

    /// Whether `command` must be waited for. Foreground-only mode overrides
    /// a background request.
    pub fn runs_in_foreground(&self, command: &Command) -> bool {
        !command.background || self.foreground_only()
    }

    /// Sets the dispositions of a freshly forked child. SIGPIPE goes back to
    /// its default since the Rust runtime ignores it and exec keeps that.
    pub fn apply_to_child(&self, foreground: bool) -> nix::Result<()> {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        // SAFETY: only default and ignore dispositions are installed.
        unsafe {
            sigaction(Signal::SIGTSTP, &ignore)?;
            sigaction(Signal::SIGPIPE, &default)?;
            if foreground {
                sigaction(Signal::SIGINT, &default)?;
            }
        }
        Ok(())
    }
}
