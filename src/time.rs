use crate::error::{WindcastError, WindcastResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeUnit {
    pub fn seconds(&self) -> i64 {
        match self {
            TimeUnit::Day => 86_400,
            TimeUnit::Hour => 3_600,
            TimeUnit::Minute => 60,
            TimeUnit::Second => 1,
        }
    }

    fn abbrev(&self) -> &'static str {
        match self {
            TimeUnit::Day => "d",
            TimeUnit::Hour => "h",
            TimeUnit::Minute => "min",
            TimeUnit::Second => "s",
        }
    }
}

/// A sampling period: an integer count of a whole time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub count: i64,
    pub unit: TimeUnit,
}

impl Period {
    pub fn new(count: i64, unit: TimeUnit) -> Self {
        Self { count, unit }
    }

    pub fn days(count: i64) -> Self {
        Self::new(count, TimeUnit::Day)
    }

    pub fn hours(count: i64) -> Self {
        Self::new(count, TimeUnit::Hour)
    }

    pub fn minutes(count: i64) -> Self {
        Self::new(count, TimeUnit::Minute)
    }

    pub fn seconds(count: i64) -> Self {
        Self::new(count, TimeUnit::Second)
    }

    pub fn to_duration(&self) -> Duration {
        Duration::seconds(self.count * self.unit.seconds())
    }

    /// Express a duration as the largest whole unit that divides it evenly,
    /// trying day, hour, minute, second in that order.
    pub fn from_duration(duration: Duration) -> WindcastResult<Self> {
        let millis = duration.num_milliseconds();
        if millis <= 0 {
            return Err(WindcastError::data_format(format!(
                "resolution must be positive, got {millis} ms"
            )));
        }
        if millis % 1_000 != 0 {
            return Err(WindcastError::data_format(format!(
                "sub-second resolution ({millis} ms) is not supported"
            )));
        }
        let secs = millis / 1_000;
        for unit in [TimeUnit::Day, TimeUnit::Hour, TimeUnit::Minute, TimeUnit::Second] {
            if secs % unit.seconds() == 0 {
                return Ok(Period::new(secs / unit.seconds(), unit));
            }
        }
        Ok(Period::seconds(secs))
    }
}

impl std::ops::Mul<i64> for Period {
    type Output = Period;

    fn mul(self, rhs: i64) -> Period {
        Period::new(self.count * rhs, self.unit)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.count, self.unit.abbrev())
    }
}

/// Derive the uniform sampling resolution of an ordered timestamp sequence.
///
/// Fails when fewer than two timestamps are given or when the consecutive
/// differences are not all identical.
pub fn infer_resolution(timestamps: &[DateTime<Utc>]) -> WindcastResult<Period> {
    if timestamps.len() < 2 {
        return Err(WindcastError::data_format(format!(
            "at least two timestamps are required to infer a resolution, got {}",
            timestamps.len()
        )));
    }
    let mut diffs: Vec<Duration> = timestamps.windows(2).map(|pair| pair[1] - pair[0]).collect();
    diffs.sort();
    diffs.dedup();
    if diffs.len() != 1 {
        return Err(WindcastError::data_format(
            "non-uniform resolution across timestamps is not supported",
        ));
    }
    Period::from_duration(diffs[0])
}

/// The ordered window-start timestamps of a windowed store.
///
/// A zero interval yields exactly `[initial_timestamp]`; a zero count yields
/// an empty sequence.
pub fn initial_times(
    initial_timestamp: DateTime<Utc>,
    count: usize,
    interval: Duration,
) -> Vec<DateTime<Utc>> {
    if count == 0 {
        return Vec::new();
    }
    if interval.is_zero() {
        return vec![initial_timestamp];
    }
    (0..count).map(|i| initial_timestamp + interval * i as i32).collect()
}
