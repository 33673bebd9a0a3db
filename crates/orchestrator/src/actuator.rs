#![forbid(unsafe_code)]

use crate::domain::ProcessSnapshot;
use crate::error::ProbeError;
use crate::system::ProcessTable;
use config::Config;
use tracing::{debug, info, warn};

/// Highest niceness the kernel accepts. Larger targets are clamped to it.
pub const NICE_LIMIT: i32 = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReniceOutcome {
    /// Negative niceness, the process is left alone.
    Protected { current: i32 },
    /// The target would not lower the priority any further.
    Unchanged { current: i32 },
    /// The niceness was raised.
    Applied { previous: i32, current: i32 },
    /// Dry run: the niceness would have been raised to `target`.
    Simulated { previous: i32, target: i32 },
}

impl ReniceOutcome {
    /// The niceness the process has, or would have, after the call.
    pub fn resulting(&self) -> i32 {
        match *self {
            Self::Protected { current }
            | Self::Unchanged { current }
            | Self::Applied { current, .. } => current,
            Self::Simulated { target, .. } => target,
        }
    }

    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::Simulated { .. })
    }
}

/// Lowers the priority of a process, never raises it.
#[derive(Debug, Clone, Copy)]
pub struct Renicer {
    dry_run: bool,
}

impl Renicer {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.daemon.dry_run)
    }

    pub fn apply(
        &self,
        table: &dyn ProcessTable,
        snapshot: &ProcessSnapshot,
        target: i32,
    ) -> Result<ReniceOutcome, ProbeError> {
        let pid = snapshot.stat.pid;
        let result = self.try_apply(table, pid, target);
        match &result {
            Ok(ReniceOutcome::Applied { previous, current }) => {
                info!(pid, previous, current, "priority modified");
            }
            Ok(ReniceOutcome::Simulated { previous, target }) => {
                info!(pid, previous, target, "priority would be modified (test mode)");
            }
            Ok(_) => {}
            Err(ProbeError::PermissionDenied { .. }) => {
                warn!(
                    pid,
                    user = %snapshot.stat.username,
                    target,
                    "permission denied setting niceness"
                );
            }
            Err(ProbeError::Vanished { .. }) => {
                debug!(pid, "process disappeared");
            }
            Err(err) => {
                warn!(pid, %err, "failed to set niceness");
            }
        }
        result
    }

    fn try_apply(
        &self,
        table: &dyn ProcessTable,
        pid: u32,
        target: i32,
    ) -> Result<ReniceOutcome, ProbeError> {
        let previous = table.nice(pid)?;
        if previous < 0 {
            return Ok(ReniceOutcome::Protected { current: previous });
        }
        let target = target.min(NICE_LIMIT);
        if target <= previous {
            return Ok(ReniceOutcome::Unchanged { current: previous });
        }
        if self.dry_run {
            return Ok(ReniceOutcome::Simulated { previous, target });
        }

        table.set_nice(pid, target)?;
        // the change already happened, a process exiting right after it is fine
        let current = table.nice(pid).unwrap_or(target);
        Ok(ReniceOutcome::Applied { previous, current })
    }
}
