use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// A vote on the 5-point emoji scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, ModelError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ModelError::Validation(format!("rating must be between 1 and 5, got {value}")))
        }
    }

    pub fn value(self) -> u8 { self.0 }

    pub fn emoji(self) -> &'static str {
        match self.0 {
            1 => "😠",
            2 => "🙁",
            3 => "😐",
            4 => "🙂",
            _ => "😄",
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self { r.0 }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Effect of toggling a user's rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingChange {
    Set(Rating),
    Replaced { previous: Rating, current: Rating },
    Removed(Rating),
}

/// Vote count and mean of a record's ratings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub count: usize,
    /// `None` while nobody has rated.
    pub average: Option<f64>,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &BTreeMap<String, Rating>) -> Self {
        let count = ratings.len();
        if count == 0 {
            return Self { count, average: None };
        }
        let total: u32 = ratings.values().map(|r| u32::from(r.value())).sum();
        Self { count, average: Some(f64::from(total) / count as f64) }
    }
}

impl fmt::Display for RatingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.average {
            Some(avg) => write!(f, "{} ratings | Average: {avg:.1}", self.count),
            None => write!(f, "{} ratings | Average: Not rated", self.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert_eq!(Rating::new(5).map(Rating::value), Ok(5));
        assert_eq!(Rating::new(1).unwrap().emoji(), "😠");
    }

    #[test]
    fn average_of_two_and_four_is_three() {
        let mut ratings = BTreeMap::new();
        ratings.insert("u1".to_string(), Rating::new(2).unwrap());
        ratings.insert("u2".to_string(), Rating::new(4).unwrap());
        let summary = RatingSummary::from_ratings(&ratings);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, Some(3.0));
        assert_eq!(summary.to_string(), "2 ratings | Average: 3.0");
    }

    #[test]
    fn no_ratings_is_unrated() {
        let summary = RatingSummary::from_ratings(&BTreeMap::new());
        assert_eq!(summary.average, None);
        assert_eq!(summary.to_string(), "0 ratings | Average: Not rated");
    }
}
