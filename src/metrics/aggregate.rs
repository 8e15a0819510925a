// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Fleet-wide totals computed over a snapshot of every training.
//!
//! Nothing is cached: totals are recomputed from the records handed in, and
//! the first malformed record aborts the whole computation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TrainingRecord;
use crate::errors::MetricResult;

/// Totals across the whole training collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTotals {
    pub total_distance_km: f64,
    pub total_calories_burnt: i64,
}

impl AggregateTotals {
    /// Compute both totals in a single pass
    pub fn from_records(records: &[TrainingRecord]) -> MetricResult<Self> {
        let mut totals = Self::default();
        for record in records {
            record.validate()?;
            totals.total_distance_km += record.distance_km;
            totals.total_calories_burnt += record.calories_burnt()?;
        }
        debug!(
            trainings = records.len(),
            total_distance_km = totals.total_distance_km,
            total_calories_burnt = totals.total_calories_burnt,
            "Aggregated training totals"
        );
        Ok(totals)
    }
}

/// Sum of every training's distance, 0 for an empty collection
pub fn total_distance(records: &[TrainingRecord]) -> MetricResult<f64> {
    records.iter().try_fold(0.0, |total, record| {
        record.validate()?;
        Ok(total + record.distance_km)
    })
}

/// Sum of every training's recomputed calories, 0 for an empty collection
pub fn total_calories_burnt(records: &[TrainingRecord]) -> MetricResult<i64> {
    records.iter().try_fold(0i64, |total, record| {
        record.validate()?;
        Ok(total + record.calories_burnt()?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MetricError;
    use proptest::prelude::*;

    fn record(distance_km: f64, duration_seconds: i64, weight_kg: f64) -> TrainingRecord {
        TrainingRecord::new(distance_km, duration_seconds, weight_kg).unwrap()
    }

    #[test]
    fn test_empty_collection_is_zero() {
        assert_eq!(total_distance(&[]).unwrap(), 0.0);
        assert_eq!(total_calories_burnt(&[]).unwrap(), 0);
        assert_eq!(AggregateTotals::from_records(&[]).unwrap(), AggregateTotals::default());
    }

    #[test]
    fn test_totals_over_two_trainings() {
        let records = vec![record(12.0, 3700, 70.0), record(10.0, 3800, 70.0)];

        assert_eq!(total_distance(&records).unwrap(), 22.0);

        let expected: i64 = records.iter().map(|r| r.calories_burnt().unwrap()).sum();
        assert_eq!(total_calories_burnt(&records).unwrap(), expected);

        let totals = AggregateTotals::from_records(&records).unwrap();
        assert_eq!(totals.total_distance_km, 22.0);
        assert_eq!(totals.total_calories_burnt, expected);
    }

    #[test]
    fn test_calories_use_each_records_weight() {
        let light = record(10.0, 3600, 50.0);
        let heavy = record(10.0, 3600, 100.0);
        assert_eq!(
            total_calories_burnt(&[light, heavy]).unwrap(),
            light.calories_burnt().unwrap() + heavy.calories_burnt().unwrap()
        );
        assert!(heavy.calories_burnt().unwrap() > light.calories_burnt().unwrap());
    }

    #[test]
    fn test_malformed_record_aborts() {
        let mut bad = record(5.0, 1800, 70.0);
        bad.duration_seconds = 0;
        let records = vec![record(10.0, 3600, 70.0), bad];

        let err = total_calories_burnt(&records).unwrap_err();
        assert!(matches!(err, MetricError::InvalidInput { field: "duration", .. }));
        assert!(AggregateTotals::from_records(&records).is_err());

        let mut negative = record(5.0, 1800, 70.0);
        negative.distance_km = -5.0;
        assert!(total_distance(&[negative]).is_err());
    }

    #[test]
    fn test_every_total_checks_the_whole_record() {
        let mut negative = record(5.0, 1800, 70.0);
        negative.distance_km = -5.0;
        let err = total_calories_burnt(&[negative]).unwrap_err();
        assert!(matches!(err, MetricError::InvalidInput { field: "distance", .. }));

        let mut no_duration = record(5.0, 1800, 70.0);
        no_duration.duration_seconds = 0;
        no_duration.weight_kg = -1.0;
        let err = total_distance(&[record(3.0, 900, 70.0), no_duration]).unwrap_err();
        assert!(matches!(err, MetricError::InvalidInput { field: "duration", .. }));

        assert!(AggregateTotals::from_records(&[negative]).is_err());
        assert!(AggregateTotals::from_records(&[no_duration]).is_err());
    }

    proptest! {
        #[test]
        fn totals_do_not_depend_on_order(
            distances in proptest::collection::vec(0u32..50_000, 0..20)
        ) {
            let records: Vec<TrainingRecord> = distances
                .iter()
                .map(|m| record(f64::from(*m) / 1000.0, 1800, 70.0))
                .collect();
            let mut reversed = records.clone();
            reversed.reverse();

            prop_assert_eq!(
                total_calories_burnt(&records).unwrap(),
                total_calories_burnt(&reversed).unwrap()
            );
            let forward = total_distance(&records).unwrap();
            let backward = total_distance(&reversed).unwrap();
            prop_assert!((forward - backward).abs() < 1e-9);
        }
    }
}
