#![forbid(unsafe_code)]

use std::time::SystemTime;

/// Identity and accounting of one process, read in a single pass.
///
/// A pid may be reused by the OS once the process exits, so a stat is only
/// meaningful for the poll that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessStat {
    pub pid: u32,
    /// Real user id.
    pub uid: u32,
    /// Effective user id.
    pub euid: u32,
    pub username: String,
    pub nice: i32,
    /// User + system CPU time in seconds.
    pub cpu_time: f64,
    pub start_time: SystemTime,
}

impl ProcessStat {
    /// Processes running as root, really or effectively, are never touched.
    pub fn is_privileged(&self) -> bool {
        self.uid == 0 || self.euid == 0
    }

    /// Seconds elapsed since the process started, zero if it started after `now`.
    pub fn age(&self, now: SystemTime) -> f64 {
        now.duration_since(self.start_time)
            .map(|age| age.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// A [`ProcessStat`] together with its sampled CPU usage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSnapshot {
    pub stat: ProcessStat,
    /// CPU usage over the sample interval, in percent of one core.
    pub cpu_percent: f32,
}
