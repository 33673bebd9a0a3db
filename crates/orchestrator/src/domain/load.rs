#![forbid(unsafe_code)]

/// System load averages over the last 1, 5 and 15 minutes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

impl LoadAverage {
    pub const fn new(one: f64, five: f64, fifteen: f64) -> Self {
        Self { one, five, fifteen }
    }

    /// Mean of all three samples.
    pub fn mean(&self) -> f64 {
        (self.one + self.five + self.fifteen) / 3.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Load is below the threshold, nothing is scanned.
    #[default]
    Idle,
    /// Load reached the threshold, the process table is scanned.
    Scanning,
}

impl LoadState {
    pub fn classify(load: f64, threshold: f64) -> Self {
        if load < threshold {
            Self::Idle
        } else {
            Self::Scanning
        }
    }
}
