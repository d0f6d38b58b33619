use log::{debug, warn};
use nix::{
    errno::Errno,
    sys::{
        signal::{kill, Signal},
        wait::{waitpid, WaitPidFlag},
    },
    unistd::Pid,
};
use serde::{Deserialize, Serialize};

use crate::{error::ShellError, status::Termination};

/// What happens when a background process is started while every slot is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse to start the command.
    #[default]
    Reject,
    /// Add slots beyond the configured capacity.
    Grow,
}

/// Non-blocking status check of a single child.
pub trait Reaper {
    /// `Ok(None)` while the process is still running.
    fn try_reap(&mut self, pid: Pid) -> nix::Result<Option<Termination>>;
}

/// Reaps real children with `waitpid(WNOHANG)`.
pub struct WaitReaper;

impl Reaper for WaitReaper {
    fn try_reap(&mut self, pid: Pid) -> nix::Result<Option<Termination>> {
        waitpid(pid, Some(WaitPidFlag::WNOHANG)).map(Termination::from_wait_status)
    }
}

/// Slot-stable set of background process ids. `None` marks an empty slot.
#[derive(Debug)]
pub struct BackgroundRegistry {
    slots: Vec<Option<Pid>>,
    capacity: usize,
    overflow: OverflowPolicy,
}

impl BackgroundRegistry {
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            overflow,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.slots.contains(&Some(pid))
    }

    /// Whether `insert` of a new pid would succeed.
    pub fn has_room(&self) -> bool {
        self.overflow == OverflowPolicy::Grow
            || self.slots.len() < self.capacity
            || self.slots.iter().any(Option::is_none)
    }

    /// Tracks `pid` in the first free slot. Inserting a tracked pid is a no-op.
    pub fn insert(&mut self, pid: Pid) -> Result<(), ShellError> {
        if self.contains(pid) {
            return Ok(());
        }
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(pid);
        } else if self.has_room() {
            self.slots.push(Some(pid));
        } else {
            warn!("registry full, not tracking pid {pid}");
            return Err(ShellError::RegistryFull {
                capacity: self.capacity,
            });
        }
        debug!("tracking background pid {pid}");
        Ok(())
    }

    /// Clears the slot holding `pid`. Returns whether it was tracked.
    pub fn remove(&mut self, pid: Pid) -> bool {
        match self.slots.iter_mut().find(|slot| **slot == Some(pid)) {
            Some(slot) => {
                *slot = None;
                debug!("released background pid {pid}");
                true
            }
            None => false,
        }
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// Checks every tracked process once without blocking and removes the
    /// finished ones. Results follow slot order.
    pub fn sweep(&mut self, reaper: &mut impl Reaper) -> Vec<(Pid, Termination)> {
        let mut finished = Vec::new();
        let mut gone = Vec::new();
        for pid in self.pids() {
            match reaper.try_reap(pid) {
                Ok(Some(termination)) => {
                    debug!("reaped background pid {pid}: {termination}");
                    finished.push((pid, termination));
                }
                Ok(None) => {}
                Err(Errno::ECHILD) => {
                    warn!("background pid {pid} is no longer our child, dropping it");
                    gone.push(pid);
                }
                Err(e) => warn!("checking background pid {pid} failed: {e}"),
            }
        }
        for pid in finished.iter().map(|(pid, _)| *pid).chain(gone) {
            self.remove(pid);
        }
        finished
    }

    /// Sends SIGTERM to every tracked process without waiting for them.
    pub fn terminate_all(&self) {
        if self.is_empty() {
            return;
        }
        debug!("terminating {} background processes", self.len());
        for pid in self.pids() {
            match kill(pid, Signal::SIGTERM) {
                Ok(()) => debug!("sent SIGTERM to {pid}"),
                Err(Errno::ESRCH) => {}
                Err(e) => warn!("failed to signal {pid}: {e}"),
            }
        }
    }
}
