use nix::unistd::{getpid, Pid};

/// Two-character marker replaced by the interpreter's pid.
pub const PID_MARKER: &str = "$$";

/// Rewrites tokens, substituting the interpreter's process id for `$$`.
#[derive(Debug, Clone)]
pub struct Expander {
    pid: String,
}

impl Expander {
    pub fn new() -> Self {
        Self::for_pid(getpid())
    }

    pub fn for_pid(pid: Pid) -> Self {
        Self { pid: pid.to_string() }
    }

    // Occurrences are replaced left to right without overlap, so "$$$" keeps
    // its trailing '$'. Digits can never recombine into a new marker.
    pub fn expand(&self, token: &str) -> String {
        token.replace(PID_MARKER, &self.pid)
    }
}

impl Default for Expander {
    fn default() -> Self {
        Self::new()
    }
}
