#![forbid(unsafe_code)]

use crate::domain::ProcessStat;
use config::{Priority, TimeModel};
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("time scale is zero")]
    DivisionByZero,
}

/// Maps accumulated time onto a niceness in `nice_min..=nice_max`.
///
/// Niceness grows linearly from `nice_min` at zero by `nice_max` every
/// `time_scale + 1` seconds and saturates at `nice_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityMapper {
    pub model: TimeModel,
    pub nice_min: i32,
    pub nice_max: i32,
    /// Seconds.
    pub time_scale: f64,
}

impl PriorityMapper {
    pub fn new(model: TimeModel, priority: &Priority) -> Self {
        Self {
            model,
            nice_min: priority.nice_min,
            nice_max: priority.nice_max,
            time_scale: priority.decay_scale(),
        }
    }

    /// The accumulated time this mapper's model looks at, in seconds.
    pub fn metric(&self, stat: &ProcessStat, now: SystemTime) -> f64 {
        match self.model {
            TimeModel::Kernel => stat.cpu_time,
            TimeModel::Relative => stat.age(now),
        }
    }

    pub fn try_nice_for(&self, metric: f64) -> Result<i32, MapError> {
        if self.time_scale == 0.0 {
            return Err(MapError::DivisionByZero);
        }
        let nice_max = self.nice_max as f64;
        let slope = -nice_max / (self.time_scale + 1.0);
        let nice = (self.nice_min as f64 - metric.max(0.0) * slope).min(nice_max);
        Ok((nice.floor() as i32).clamp(self.nice_min, self.nice_max))
    }

    /// Like [`try_nice_for`](Self::try_nice_for), but a zero time scale
    /// yields `nice_max`.
    pub fn nice_for(&self, metric: f64) -> i32 {
        self.try_nice_for(metric).unwrap_or_else(|err| {
            debug!(model = ?self.model, %err, nice = self.nice_max, "using maximum niceness");
            self.nice_max
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mapper(time_scale: f64) -> PriorityMapper {
        PriorityMapper {
            model: TimeModel::Kernel,
            nice_min: 0,
            nice_max: 20,
            time_scale,
        }
    }

    #[test]
    fn interpolates_linearly() {
        let m = mapper(99.0);
        assert_eq!(m.nice_for(0.0), 0);
        assert_eq!(m.nice_for(5.0), 1);
        assert_eq!(m.nice_for(50.0), 10);
        assert_eq!(m.nice_for(100.0), 20);
        assert_eq!(m.nice_for(1e9), 20);
    }

    #[test]
    fn one_hour_of_cpu_on_a_week_scale() {
        let m = mapper(604_800.0);
        assert_eq!(m.nice_for(3600.0), 0);
        assert_eq!(m.nice_for(604_800.0 / 2.0), 9);
    }

    #[test]
    fn zero_scale_is_division_by_zero() {
        let m = mapper(0.0);
        assert_eq!(m.try_nice_for(10.0), Err(MapError::DivisionByZero));
        assert_eq!(m.nice_for(0.0), 20);
        assert_eq!(m.nice_for(10.0), 20);
    }

    #[test]
    fn relative_model_uses_age() {
        let priority = Priority::default();
        let m = PriorityMapper::new(TimeModel::Relative, &priority);
        let start_time = SystemTime::UNIX_EPOCH;
        let stat = ProcessStat {
            pid: 1,
            uid: 1000,
            euid: 1000,
            username: "alice".into(),
            nice: 0,
            cpu_time: 1.0,
            start_time,
        };
        let now = start_time + std::time::Duration::from_secs(30);
        assert_eq!(m.metric(&stat, now), 30.0);
    }

    proptest! {
        #[test]
        fn monotonic_in_metric(
            a in 0.0f64..1e8,
            b in 0.0f64..1e8,
            scale in 0.0f64..1e7,
            nice_max in 0i32..=40,
        ) {
            let m = PriorityMapper { nice_max, ..mapper(scale) };
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(m.nice_for(lo) <= m.nice_for(hi));
        }

        #[test]
        fn always_clamped(
            metric in prop::num::f64::ANY,
            scale in 0.0f64..1e9,
            nice_min in 0i32..=20,
            span in 0i32..=20,
        ) {
            let m = PriorityMapper {
                model: TimeModel::Relative,
                nice_min,
                nice_max: nice_min + span,
                time_scale: scale,
            };
            let nice = m.nice_for(metric);
            prop_assert!((m.nice_min..=m.nice_max).contains(&nice));
        }
    }
}
