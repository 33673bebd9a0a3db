#![forbid(unsafe_code)]

use crate::domain::{ProcessSnapshot, ProcessStat};
use crate::error::{Error, ProbeError};
use crate::system::ProcessTable;
use config::Config;
use std::time::Duration;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Owned by root, really or effectively.
    Privileged,
    /// The daemon itself.
    OwnProcess,
    /// Owned by a user other than the configured one.
    UserMismatch,
    /// Not enough accumulated CPU time.
    CpuTimeBelow,
    /// Not busy enough during the sample interval.
    CpuPercentBelow,
}

/// Selects the processes whose priority should be lowered.
#[derive(Debug, Clone)]
pub struct ProcessFilter {
    cpu_percent: f32,
    cpu_time: f64,
    user: Option<String>,
    sample_interval: Duration,
    self_pid: u32,
}

impl ProcessFilter {
    pub fn new(config: &Config, self_pid: u32) -> Self {
        Self {
            cpu_percent: config.thresholds.cpu_percent,
            cpu_time: config.thresholds.cpu_time.as_secs_f64(),
            user: config.daemon.user_filter().map(str::to_owned),
            sample_interval: config.daemon.sample_interval,
            self_pid,
        }
    }

    /// Checks that need no CPU sample. Run first so excluded processes are
    /// never sampled.
    pub fn screen(&self, stat: &ProcessStat) -> Result<(), RejectReason> {
        if stat.is_privileged() {
            return Err(RejectReason::Privileged);
        }
        if stat.pid == self.self_pid {
            return Err(RejectReason::OwnProcess);
        }
        if let Some(user) = &self.user {
            if *user != stat.username {
                return Err(RejectReason::UserMismatch);
            }
        }
        // strictly greater: a process exactly at the threshold is left alone
        if stat.cpu_time <= self.cpu_time {
            return Err(RejectReason::CpuTimeBelow);
        }
        Ok(())
    }

    /// Full decision on a sampled process.
    pub fn decide(&self, snapshot: &ProcessSnapshot) -> Result<(), RejectReason> {
        self.screen(&snapshot.stat)?;
        if snapshot.cpu_percent <= self.cpu_percent {
            return Err(RejectReason::CpuPercentBelow);
        }
        Ok(())
    }

    /// One lazy pass over the process table.
    ///
    /// Each process is inspected only when the iterator reaches it.
    /// Processes that vanish or cannot be read are logged and skipped.
    pub fn candidates<'a>(&'a self, table: &'a dyn ProcessTable) -> Result<Candidates<'a>, Error> {
        let pids = table.pids()?;
        Ok(Candidates {
            filter: self,
            table,
            pids: pids.into_iter(),
        })
    }

    fn inspect(
        &self,
        table: &dyn ProcessTable,
        pid: u32,
    ) -> Result<Option<ProcessSnapshot>, ProbeError> {
        if pid == self.self_pid {
            return Ok(None);
        }
        let stat = table.stat(pid)?;
        if let Err(reason) = self.screen(&stat) {
            trace!(pid, ?reason, "process skipped");
            return Ok(None);
        }

        let cpu_percent = table.cpu_percent(pid, self.sample_interval)?;
        let snapshot = ProcessSnapshot { stat, cpu_percent };
        if let Err(reason) = self.decide(&snapshot) {
            trace!(pid, cpu_percent, ?reason, "process skipped");
            return Ok(None);
        }

        debug!(
            pid,
            user = %snapshot.stat.username,
            cpu_percent,
            cpu_percent_threshold = self.cpu_percent,
            cpu_time = snapshot.stat.cpu_time,
            cpu_time_threshold = self.cpu_time,
            "usage thresholds exceeded"
        );
        Ok(Some(snapshot))
    }
}

/// Iterator returned by [`ProcessFilter::candidates`].
pub struct Candidates<'a> {
    filter: &'a ProcessFilter,
    table: &'a dyn ProcessTable,
    pids: std::vec::IntoIter<u32>,
}

impl Iterator for Candidates<'_> {
    type Item = ProcessSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        for pid in self.pids.by_ref() {
            match self.filter.inspect(self.table, pid) {
                Ok(Some(snapshot)) => return Some(snapshot),
                Ok(None) => {}
                Err(ProbeError::Vanished { pid }) => {
                    debug!(pid, "process disappeared");
                }
                Err(err) => {
                    warn!(pid = err.pid(), %err, "failed to inspect process");
                }
            }
        }
        None
    }
}
