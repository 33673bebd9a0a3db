use crate::TimeSpan;
use serde::{Deserialize, Serialize};

/// Which accumulated time a niceness is derived from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeModel {
    /// Total user + system CPU time accumulated by the process.
    Kernel,

    /// Wall-clock time elapsed since the process started.
    Relative,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Priority {
    /// Models tried in order for every candidate. The first one producing a
    /// non-zero niceness wins.
    pub models: Vec<TimeModel>,

    /// Niceness assigned to a process with no accumulated time.
    pub nice_min: i32,

    /// Upper bound of the computed niceness.
    pub nice_max: i32,

    /// Amount of accumulated time over which niceness grows from `nice_min`
    /// to `nice_max`.
    pub time_scale: TimeSpan,

    /// Multiplier applied to `time_scale`.
    pub time_factor: f64,
}

impl Default for Priority {
    fn default() -> Self {
        Self {
            models: vec![TimeModel::Kernel, TimeModel::Relative],
            nice_min: 0,
            nice_max: 20,
            // one week
            time_scale: TimeSpan::from_secs_f64(604_800.0),
            time_factor: 1.0,
        }
    }
}

impl Priority {
    /// Effective decay scale in seconds.
    pub fn decay_scale(&self) -> f64 {
        self.time_scale.as_secs_f64() * self.time_factor
    }
}
