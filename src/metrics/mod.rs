// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Metric Calculation Engine
//!
//! Deterministic formulas that turn raw training and body measurements into
//! derived health statistics, plus the roll-ups computed over the whole
//! training collection.
//!
//! Every function here is pure: no I/O, no shared mutable state. The lookup
//! tables are `match` expressions, so calling them concurrently from any number
//! of request tasks needs no synchronisation.
//!
//! Units: centimetres, kilograms, seconds, km/h, kilocalories.
//!
//! ```rust
//! use runningapp::metrics::{average_pace, calories_burnt, bmi};
//!
//! let pace = average_pace(1800, 7.0).unwrap();
//! assert_eq!(pace, 14.0);
//! assert_eq!(calories_burnt(70.0, 15.0, 1800).unwrap(), 477);
//! assert_eq!(bmi(165.0, 58.0).unwrap(), 21.3);
//! ```

pub mod aggregate;
pub mod body;
pub mod training;

pub use aggregate::{total_calories_burnt, total_distance, AggregateTotals};
pub use body::{
    activity_factor, basal_metabolic_rate, bmi, daily_caloric_needs, BodyProfile, Gender,
};
pub use training::{average_pace, calories_burnt, met_value, TrainingRecord};

use crate::errors::{MetricError, MetricResult};

/// Round to one decimal place, ties away from zero.
///
/// `f64::round` is used rather than banker's rounding, so a pace of exactly
/// 10.25 km/h becomes 10.3. The result feeds the MET threshold lookup, so the
/// tie-break is pinned down by tests.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn require_positive(field: &'static str, value: f64) -> MetricResult<f64> {
    if !value.is_finite() {
        return Err(MetricError::invalid(field, "must be a finite number"));
    }
    if value <= 0.0 {
        return Err(MetricError::invalid(
            field,
            format!("must be greater than zero, got {value}"),
        ));
    }
    Ok(value)
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> MetricResult<f64> {
    if !value.is_finite() {
        return Err(MetricError::invalid(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(MetricError::invalid(
            field,
            format!("must not be negative, got {value}"),
        ));
    }
    Ok(value)
}

pub(crate) fn require_positive_seconds(field: &'static str, value: i64) -> MetricResult<i64> {
    if value <= 0 {
        return Err(MetricError::invalid(
            field,
            format!("must be greater than zero, got {value}"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_tenth_ties_away_from_zero() {
        assert_eq!(round_to_tenth(10.25), 10.3);
        assert_eq!(round_to_tenth(10.24), 10.2);
        assert_eq!(round_to_tenth(21.303), 21.3);
        assert_eq!(round_to_tenth(14.0), 14.0);
    }

    #[test]
    fn test_validators() {
        assert!(require_positive("weight", 70.0).is_ok());
        assert!(require_positive("weight", 0.0).is_err());
        assert!(require_positive("weight", f64::NAN).is_err());
        assert!(require_non_negative("distance", 0.0).is_ok());
        assert!(require_non_negative("distance", -0.1).is_err());
        assert!(require_non_negative("distance", f64::INFINITY).is_err());
        assert!(require_positive_seconds("duration", 0).is_err());
        assert!(require_positive_seconds("duration", 1).is_ok());
    }
}
