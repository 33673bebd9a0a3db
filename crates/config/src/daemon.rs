use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Daemon {
    /// Time to wait between two polls of the load average. **Measured in
    /// seconds**, fractions allowed.
    #[serde_as(as = "serde_with::DurationSecondsWithFrac<f64>")]
    pub poll: Duration,

    /// Interval over which the CPU usage of a single process is sampled.
    /// **Measured in milliseconds**.
    ///
    /// ## Note
    ///
    /// Sampling blocks the poll loop, once per inspected process. Must be
    /// greater than zero.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub sample_interval: Duration,

    /// Compute and report priority changes without applying them.
    pub dry_run: bool,

    /// Only consider processes owned by this user. Empty means any user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self {
            poll: Duration::from_secs(3),
            sample_interval: Duration::from_millis(50),
            dry_run: false,
            user: None,
        }
    }
}

impl Daemon {
    /// The configured user filter, ignoring an empty name.
    pub fn user_filter(&self) -> Option<&str> {
        self.user.as_deref().filter(|user| !user.is_empty())
    }
}
