use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rating score, always within `Score::MIN..=Score::MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Score(u8);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("Score is required")]
    Missing,
    #[error("Score must be between 1 and 5, got {0}")]
    OutOfRange(i64),
}

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, ScoreError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ScoreError::OutOfRange(value))
        }
    }

    /// Validate an optional score coming from a request body.
    pub fn from_request(value: Option<i64>) -> Result<Self, ScoreError> {
        value.ok_or(ScoreError::Missing).and_then(Self::new)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for Score {
    type Error = ScoreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value.into())
    }
}

impl From<Score> for i32 {
    fn from(score: Score) -> Self {
        score.0.into()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arithmetic mean of `scores` rounded to one decimal place.
///
/// Returns `None` for an empty slice. Rounding is half away from zero, so
/// `[4, 5]` gives `4.5` and `[1, 1, 2]` (1.333..) gives `1.3`.
pub fn average_score(scores: &[i32]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: i64 = scores.iter().map(|&s| i64::from(s)).sum();
    let mean = sum as f64 / scores.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}
