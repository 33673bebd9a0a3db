#![forbid(unsafe_code)]

mod filter;
mod mapper;

pub use filter::{Candidates, ProcessFilter, RejectReason};
pub use mapper::{MapError, PriorityMapper};

use crate::domain::ProcessStat;
use config::Priority;
use std::time::SystemTime;

/// Target niceness for a candidate, trying each configured time model in turn.
#[derive(Debug, Clone)]
pub struct PriorityPolicy {
    mappers: Vec<PriorityMapper>,
}

impl PriorityPolicy {
    pub fn new(priority: &Priority) -> Self {
        let mappers = priority
            .models
            .iter()
            .map(|&model| PriorityMapper::new(model, priority))
            .collect();
        Self { mappers }
    }

    /// The first non-zero niceness produced by the models, or zero.
    pub fn target(&self, stat: &ProcessStat, now: SystemTime) -> i32 {
        self.mappers
            .iter()
            .map(|mapper| mapper.nice_for(mapper.metric(stat, now)))
            .find(|&nice| nice != 0)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::TimeSpan;
    use std::time::Duration;

    fn stat(cpu_time: f64, age: u64) -> (ProcessStat, SystemTime) {
        let start_time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let stat = ProcessStat {
            pid: 1234,
            uid: 1000,
            euid: 1000,
            username: "alice".into(),
            nice: 0,
            cpu_time,
            start_time,
        };
        (stat, start_time + Duration::from_secs(age))
    }

    fn priority(scale: f64) -> Priority {
        Priority {
            time_scale: TimeSpan::from_secs_f64(scale),
            ..Priority::default()
        }
    }

    #[test]
    fn kernel_time_wins_when_non_zero() {
        let policy = PriorityPolicy::new(&priority(8000.0));
        let (stat, now) = stat(3700.0, 100_000);
        assert_eq!(policy.target(&stat, now), 9);
    }

    #[test]
    fn falls_back_to_wall_clock_age() {
        let policy = PriorityPolicy::new(&priority(8000.0));
        let (stat, now) = stat(100.0, 4000);
        // 100 s of CPU time maps to 0, 4000 s of age maps to 9
        assert_eq!(policy.target(&stat, now), 9);
    }

    #[test]
    fn zero_when_every_model_is_zero() {
        let policy = PriorityPolicy::new(&priority(8000.0));
        let (stat, now) = stat(10.0, 10);
        assert_eq!(policy.target(&stat, now), 0);
    }
}
