//! Period - the interval between two cycles.
//!
//! Grammar: `<positive integer><unit>`, unit one of `s`, `m`, `h`.
//! - a non-numeric or non-positive magnitude is coerced to `1`
//! - an unknown unit falls back to minutes
//! - only an empty string is rejected

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("period is empty")]
    Empty,

    #[error("period {0:?} is too large")]
    OutOfRange(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(String);

impl Period {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_duration(&self) -> Result<Duration, PeriodError> {
        let value = self.0.trim();
        let Some(unit) = value.chars().last() else {
            return Err(PeriodError::Empty);
        };

        let magnitude = value[..value.len() - unit.len_utf8()]
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(1) as u64;

        let scale = match unit {
            'h' => 60 * 60,
            's' => 1,
            _ => 60,
        };

        magnitude
            .checked_mul(scale)
            .map(Duration::from_secs)
            .ok_or_else(|| PeriodError::OutOfRange(self.0.clone()))
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::new("1m")
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Period {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
