#![forbid(unsafe_code)]

mod daemon;
mod error;
mod priority;
mod thresholds;
mod timescale;

pub use daemon::Daemon;
pub use error::Error;
pub use priority::{Priority, TimeModel};
pub use thresholds::Thresholds;
pub use timescale::{TimeSpan, parse_time_scale};

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub thresholds: Thresholds,
    pub priority: Priority,
    pub daemon: Daemon,
}

impl Config {
    /// Load configuration from a TOML file. Missing fields are filled with defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml_edit::de::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let toml = toml_edit::ser::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from multiple TOML files. Later files override earlier ones.
    pub fn load_multiple<T, U>(paths: U) -> Result<Self, Error>
    where
        T: AsRef<Path>,
        U: IntoIterator<Item = T>,
    {
        let mut merged = toml_edit::DocumentMut::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(path)?;
            let doc: toml_edit::DocumentMut = text.parse()?;
            merge_document(&mut merged, doc);
        }
        let config: Config = toml_edit::de::from_str(&merged.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the poll loop cannot work with.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |field, reason: &str| {
            Err(Error::InvalidValue {
                field,
                reason: reason.to_owned(),
            })
        };

        let thresholds = &self.thresholds;
        if !thresholds.cpu_percent.is_finite() || thresholds.cpu_percent < 0.0 {
            return invalid("thresholds.cpu_percent", "must be a non-negative number");
        }
        if !thresholds.cpu_time.as_secs_f64().is_finite() {
            return invalid("thresholds.cpu_time", "must be finite");
        }
        if !thresholds.load.is_finite() || thresholds.load < 0.0 {
            return invalid("thresholds.load", "must be a non-negative number");
        }

        let priority = &self.priority;
        if priority.models.is_empty() {
            return invalid("priority.models", "at least one time model is required");
        }
        if priority.nice_min > priority.nice_max {
            return Err(Error::InvalidValue {
                field: "priority.nice_min",
                reason: format!(
                    "{} is greater than nice_max {}",
                    priority.nice_min, priority.nice_max
                ),
            });
        }
        if !(0..=40).contains(&priority.nice_min) || !(0..=40).contains(&priority.nice_max) {
            return invalid("priority", "nice_min and nice_max must lie within 0..=40");
        }
        if !priority.time_factor.is_finite() || priority.time_factor < 0.0 {
            return invalid("priority.time_factor", "must be a non-negative number");
        }
        if !priority.decay_scale().is_finite() {
            return invalid("priority.time_scale", "scaled value is not finite");
        }

        if self.daemon.poll.is_zero() {
            return invalid("daemon.poll", "must be greater than zero");
        }
        if self.daemon.sample_interval.is_zero() {
            return invalid("daemon.sample_interval", "must be greater than zero");
        }
        Ok(())
    }
}

fn merge_document(target: &mut toml_edit::DocumentMut, source: toml_edit::DocumentMut) {
    for (key, item) in source.iter() {
        merge_item(
            target.entry(key).or_insert(toml_edit::Item::None),
            item.clone(),
        );
    }
}

fn merge_item(target: &mut toml_edit::Item, source: toml_edit::Item) {
    use toml_edit::Item;
    match (target, source) {
        (Item::Table(target_table), Item::Table(source_table)) => {
            for (key, item) in source_table.iter() {
                merge_item(target_table.entry(key).or_insert(Item::None), item.clone());
            }
        }
        (target_item, source_item) => {
            *target_item = source_item;
        }
    }
}
