#![forbid(unsafe_code)]

//! Human readable durations such as `30s`, `2.5h` or `1w`.

use crate::Error;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt;
use std::str::FromStr;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const WEEK: f64 = 7.0 * DAY;
/// A month is treated as four weeks.
const MONTH: f64 = 4.0 * WEEK;
/// A year is twelve four-week months.
const YEAR: f64 = 12.0 * MONTH;

/// Units used when rendering a span, largest first.
const DISPLAY_UNITS: [(char, f64); 5] = [
    ('w', WEEK),
    ('d', DAY),
    ('h', HOUR),
    ('m', MINUTE),
    ('s', 1.0),
];

fn unit_seconds(unit: char) -> Option<f64> {
    match unit {
        's' => Some(1.0),
        'm' => Some(MINUTE),
        'h' => Some(HOUR),
        'd' => Some(DAY),
        'w' => Some(WEEK),
        'M' => Some(MONTH),
        'y' => Some(YEAR),
        _ => None,
    }
}

/// Parse `<number><unit>` into seconds.
///
/// The number is a non-negative decimal with at most one decimal point; the
/// unit is one of `s`, `m`, `h`, `d`, `w`, `M` (four weeks) or `y` (48 weeks).
///
/// # Examples
///
/// ```
/// # use config::parse_time_scale;
/// assert_eq!(parse_time_scale("30s").unwrap(), 30.0);
/// assert_eq!(parse_time_scale("1.5w").unwrap(), 907_200.0);
/// assert!(parse_time_scale("1x").is_err());
/// assert!(parse_time_scale("w").is_err());
/// ```
pub fn parse_time_scale(input: &str) -> Result<f64, Error> {
    let invalid = |reason| Error::InvalidFormat {
        input: input.to_owned(),
        reason,
    };

    let mut chars = input.chars();
    let unit = chars.next_back().ok_or_else(|| invalid("empty duration"))?;
    let number = chars.as_str();
    if number.is_empty() {
        return Err(invalid("expected a number followed by a unit"));
    }
    if !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid("number may only contain digits and a decimal point"));
    }
    if number.matches('.').count() > 1 {
        return Err(invalid("number has more than one decimal point"));
    }
    let scale = unit_seconds(unit).ok_or_else(|| invalid("unknown unit"))?;
    let value: f64 = number.parse().map_err(|_| invalid("not a number"))?;

    Ok(value * scale)
}

/// A span of time in (fractional) seconds, written as a duration string.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, SerializeDisplay, DeserializeFromStr)]
pub struct TimeSpan(f64);

impl TimeSpan {
    pub const fn from_secs_f64(secs: f64) -> Self {
        Self(secs)
    }

    pub const fn as_secs_f64(self) -> f64 {
        self.0
    }
}

impl FromStr for TimeSpan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_time_scale(s).map(Self)
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0.0 {
            for (unit, scale) in DISPLAY_UNITS {
                let count = self.0 / scale;
                if count.fract() == 0.0 {
                    return write!(f, "{count}{unit}");
                }
            }
        }
        write!(f, "{}s", self.0)
    }
}
