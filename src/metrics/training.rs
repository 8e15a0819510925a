// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-session training metrics: average pace, MET and calories burnt.
//!
//! MET values follow the running category of the Compendium of Physical
//! Activities.

use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_positive, require_positive_seconds, round_to_tenth};
use crate::errors::MetricResult;

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

/// Average speed in km/h, rounded to one decimal place.
///
/// Fails when `duration_seconds` is not positive or `distance_km` is negative.
pub fn average_pace(duration_seconds: i64, distance_km: f64) -> MetricResult<f64> {
    let duration_seconds = require_positive_seconds("duration", duration_seconds)?;
    let distance_km = require_non_negative("distance", distance_km)?;

    let hours = duration_seconds as f64 / SECONDS_PER_HOUR;
    Ok(round_to_tenth(distance_km / hours))
}

/// Metabolic equivalent of running at `average_pace_kmh`.
///
/// Bands are evaluated top-down, first match wins. Callers validate the pace
/// first; a negative pace would otherwise land in the slowest band.
pub fn met_value(average_pace_kmh: f64) -> f64 {
    let pace = average_pace_kmh;
    if pace > 22.0 {
        23.0
    } else if pace >= 19.0 {
        19.0
    } else if pace >= 17.0 {
        16.0
    } else if pace >= 16.0 {
        14.5
    } else if pace >= 15.0 {
        13.0
    } else if pace >= 12.0 {
        12.0
    } else if pace >= 11.0 {
        11.0
    } else if pace >= 9.0 {
        10.0
    } else if pace >= 8.0 {
        9.0
    } else {
        6.0
    }
}

/// Energy spent during one session, truncated toward zero.
///
/// `MET * 3.5 * weight / 200` is kcal per minute.
pub fn calories_burnt(weight_kg: f64, average_pace_kmh: f64, duration_seconds: i64) -> MetricResult<i64> {
    let weight_kg = require_positive("weight", weight_kg)?;
    let pace = require_non_negative("average pace", average_pace_kmh)?;
    let duration_seconds = require_positive_seconds("duration", duration_seconds)?;

    let met = met_value(pace);
    let minutes = duration_seconds as f64 / SECONDS_PER_MINUTE;
    let calories = met * 3.5 * weight_kg / 200.0 * minutes;

    Ok(calories.trunc() as i64)
}

/// One training session as seen by the calculators.
///
/// `weight_kg` is the body weight of the athlete who ran it; calories are
/// always recomputed from it rather than read from storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub distance_km: f64,
    pub duration_seconds: i64,
    pub average_pace_kmh: f64,
    pub weight_kg: f64,
}

impl TrainingRecord {
    /// Build a record from raw measurements, deriving the average pace.
    pub fn new(distance_km: f64, duration_seconds: i64, weight_kg: f64) -> MetricResult<Self> {
        let average_pace_kmh = average_pace(duration_seconds, distance_km)?;
        require_positive("weight", weight_kg)?;
        Ok(Self {
            distance_km,
            duration_seconds,
            average_pace_kmh,
            weight_kg,
        })
    }

    /// Check a record that was assembled from stored columns.
    pub fn validate(&self) -> MetricResult<()> {
        require_non_negative("distance", self.distance_km)?;
        require_positive_seconds("duration", self.duration_seconds)?;
        require_non_negative("average pace", self.average_pace_kmh)?;
        require_positive("weight", self.weight_kg)?;
        Ok(())
    }

    pub fn met_value(&self) -> MetricResult<f64> {
        let pace = require_non_negative("average pace", self.average_pace_kmh)?;
        Ok(met_value(pace))
    }

    pub fn calories_burnt(&self) -> MetricResult<i64> {
        calories_burnt(self.weight_kg, self.average_pace_kmh, self.duration_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MetricError;
    use proptest::prelude::*;

    const MET_VALUES: [f64; 10] = [6.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.5, 16.0, 19.0, 23.0];

    #[test]
    fn test_average_pace() {
        assert_eq!(average_pace(1800, 7.0).unwrap(), 14.0);
        assert_eq!(average_pace(3600, 15.0).unwrap(), 15.0);
        assert_eq!(average_pace(3600, 10.0).unwrap(), 10.0);
        // 12 km in 3700 s is 11.675... km/h
        assert_eq!(average_pace(3700, 12.0).unwrap(), 11.7);
    }

    #[test]
    fn test_average_pace_tie_rounds_away_from_zero() {
        assert_eq!(average_pace(3600, 10.25).unwrap(), 10.3);
    }

    #[test]
    fn test_average_pace_zero_distance() {
        assert_eq!(average_pace(600, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_average_pace_rejects_zero_duration() {
        let err = average_pace(0, 5.0).unwrap_err();
        assert!(matches!(err, MetricError::InvalidInput { field: "duration", .. }));
    }

    #[test]
    fn test_average_pace_rejects_negative_distance() {
        assert!(average_pace(600, -1.0).is_err());
    }

    #[test]
    fn test_met_value_band_boundaries() {
        assert_eq!(met_value(22.5), 23.0);
        assert_eq!(met_value(22.0), 19.0);
        assert_eq!(met_value(19.0), 19.0);
        assert_eq!(met_value(18.999), 16.0);
        assert_eq!(met_value(17.0), 16.0);
        assert_eq!(met_value(16.5), 14.5);
        assert_eq!(met_value(16.0), 14.5);
        assert_eq!(met_value(15.0), 13.0);
        assert_eq!(met_value(14.9), 12.0);
        assert_eq!(met_value(12.0), 12.0);
        assert_eq!(met_value(11.0), 11.0);
        assert_eq!(met_value(10.9), 10.0);
        assert_eq!(met_value(9.0), 10.0);
        assert_eq!(met_value(8.0), 9.0);
        assert_eq!(met_value(7.999), 6.0);
        assert_eq!(met_value(0.0), 6.0);
    }

    #[test]
    fn test_calories_burnt() {
        // MET 13, 70 kg, 30 minutes: 477.75 kcal
        assert_eq!(calories_burnt(70.0, 15.0, 1800).unwrap(), 477);
    }

    #[test]
    fn test_calories_burnt_truncates() {
        // MET 6, 80 kg: 10 minutes is 84 kcal, 10 min 59 s is 92.26 kcal
        assert_eq!(calories_burnt(80.0, 5.0, 600).unwrap(), 84);
        assert_eq!(calories_burnt(80.0, 5.0, 659).unwrap(), 92);
    }

    #[test]
    fn test_calories_burnt_rejects_invalid_input() {
        assert!(calories_burnt(0.0, 10.0, 1800).is_err());
        assert!(calories_burnt(70.0, -1.0, 1800).is_err());
        assert!(calories_burnt(70.0, 10.0, 0).is_err());
    }

    #[test]
    fn test_training_record_derives_pace_then_calories() {
        let record = TrainingRecord::new(7.0, 1800, 80.0).unwrap();
        assert_eq!(record.average_pace_kmh, 14.0);
        assert_eq!(record.met_value().unwrap(), 12.0);
        // 12 * 3.5 * 80 / 200 * 30 = 504
        assert_eq!(record.calories_burnt().unwrap(), 504);
    }

    #[test]
    fn test_training_record_rejects_bad_weight() {
        assert!(TrainingRecord::new(7.0, 1800, -70.0).is_err());
    }

    #[test]
    fn test_calculators_are_idempotent() {
        assert_eq!(average_pace(2520, 9.3).unwrap(), average_pace(2520, 9.3).unwrap());
        assert_eq!(
            calories_burnt(64.5, 13.3, 2520).unwrap(),
            calories_burnt(64.5, 13.3, 2520).unwrap()
        );
    }

    proptest! {
        #[test]
        fn met_value_is_always_a_known_band(pace in 0.0f64..60.0) {
            let met = met_value(pace);
            prop_assert!(MET_VALUES.contains(&met));
        }

        #[test]
        fn met_value_never_decreases_with_pace(a in 0.0f64..40.0, b in 0.0f64..40.0) {
            let (slow, fast) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(met_value(slow) <= met_value(fast));
        }

        #[test]
        fn calories_are_never_negative(
            weight in 30.0f64..200.0,
            pace in 0.0f64..30.0,
            seconds in 1i64..36_000,
        ) {
            prop_assert!(calories_burnt(weight, pace, seconds).unwrap() >= 0);
        }
    }
}
