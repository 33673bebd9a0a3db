use crate::TimeSpan;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    /// A process is only considered once its CPU usage, sampled over
    /// `daemon.sample_interval`, exceeds this percentage of one core.
    pub cpu_percent: f32,

    /// Minimum accumulated user + system CPU time before a process is
    /// considered. Written as a duration string, e.g. `30m`.
    pub cpu_time: TimeSpan,

    /// Processes are only scanned while the mean of the system load averages
    /// is at or above this value. Defaults to half the number of CPUs, or the
    /// number of CPUs on machines where that would be below one.
    pub load: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 50.0,
            cpu_time: TimeSpan::from_secs_f64(1.0),
            load: default_load_threshold(),
        }
    }
}

fn default_load_threshold() -> f64 {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1) as f64;
    let half = cpus / 2.0;
    if half < 1.0 { cpus } else { half }
}
