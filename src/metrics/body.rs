// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Body composition and energy needs: BMI, basal metabolic rate and the
//! activity-adjusted daily caloric needs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{require_positive, round_to_tenth};
use crate::errors::{MetricError, MetricResult};

/// Gender used to pick a BMR formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = MetricError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            other => Err(MetricError::UnsupportedCategory {
                category: "gender",
                value: other.to_string(),
            }),
        }
    }
}

/// Multiplier applied to BMR for a given number of trainings per week.
///
/// 3 and 4 share a factor, as do 6 and 7.
pub fn activity_factor(trainings_per_week: u32) -> MetricResult<f64> {
    let factor = match trainings_per_week {
        0 => 1.0,
        1 => 1.2,
        2 => 1.4,
        3 | 4 => 1.6,
        5 => 1.8,
        6 | 7 => 2.0,
        other => {
            return Err(MetricError::invalid(
                "trainings per week",
                format!("must be between 0 and 7, got {other}"),
            ))
        }
    };
    Ok(factor)
}

/// Body-mass index rounded to one decimal place
pub fn bmi(height_cm: f64, weight_kg: f64) -> MetricResult<f64> {
    let height_cm = require_positive("height", height_cm)?;
    let weight_kg = require_positive("weight", weight_kg)?;

    let height_m = height_cm / 100.0;
    Ok(round_to_tenth(weight_kg / height_m.powi(2)))
}

/// Harris-Benedict basal metabolic rate, in kcal per day
pub fn basal_metabolic_rate(age: u32, height_cm: f64, weight_kg: f64, gender: Gender) -> MetricResult<f64> {
    let height_cm = require_positive("height", height_cm)?;
    let weight_kg = require_positive("weight", weight_kg)?;
    let age = f64::from(age);

    let bmr = match gender {
        Gender::Female => 655.0 + 9.6 * weight_kg + 1.8 * height_cm - 4.7 * age,
        Gender::Male => 66.0 + 13.8 * weight_kg + 5.0 * height_cm - 6.8 * age,
    };
    Ok(bmr)
}

/// Daily caloric needs: BMR scaled by the activity factor, truncated toward zero
pub fn daily_caloric_needs(
    age: u32,
    height_cm: f64,
    weight_kg: f64,
    gender: Gender,
    trainings_per_week: u32,
) -> MetricResult<i64> {
    let factor = activity_factor(trainings_per_week)?;
    let bmr = basal_metabolic_rate(age, height_cm, weight_kg, gender)?;
    Ok((bmr * factor).trunc() as i64)
}

/// Body measurements of one person, immutable for the duration of a calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyProfile {
    pub height_cm: f64,
    pub weight_kg: f64,
    pub age: u32,
    pub gender: Gender,
}

impl BodyProfile {
    pub fn bmi(&self) -> MetricResult<f64> {
        bmi(self.height_cm, self.weight_kg)
    }

    pub fn basal_metabolic_rate(&self) -> MetricResult<f64> {
        basal_metabolic_rate(self.age, self.height_cm, self.weight_kg, self.gender)
    }

    pub fn daily_caloric_needs(&self, trainings_per_week: u32) -> MetricResult<i64> {
        daily_caloric_needs(
            self.age,
            self.height_cm,
            self.weight_kg,
            self.gender,
            trainings_per_week,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmi() {
        assert_eq!(bmi(165.0, 58.0).unwrap(), 21.3);
        assert_eq!(bmi(170.0, 100.0).unwrap(), 34.6);
        assert_ne!(bmi(165.0, 58.0).unwrap(), 21.0);
    }

    #[test]
    fn test_bmi_rejects_non_positive_height() {
        assert!(bmi(0.0, 58.0).is_err());
        assert!(bmi(-165.0, 58.0).is_err());
        assert!(bmi(165.0, 0.0).is_err());
    }

    #[test]
    fn test_activity_factor_table() {
        assert_eq!(activity_factor(0).unwrap(), 1.0);
        assert_eq!(activity_factor(1).unwrap(), 1.2);
        assert_eq!(activity_factor(2).unwrap(), 1.4);
        assert_eq!(activity_factor(3).unwrap(), 1.6);
        assert_eq!(activity_factor(3).unwrap(), activity_factor(4).unwrap());
        assert_eq!(activity_factor(5).unwrap(), 1.8);
        assert_ne!(activity_factor(5).unwrap(), 2.0);
        assert_eq!(activity_factor(6).unwrap(), 2.0);
        assert_eq!(activity_factor(6).unwrap(), activity_factor(7).unwrap());
    }

    #[test]
    fn test_activity_factor_out_of_range() {
        let err = activity_factor(8).unwrap_err();
        assert!(matches!(
            err,
            MetricError::InvalidInput { field: "trainings per week", .. }
        ));
    }

    #[test]
    fn test_daily_caloric_needs_female() {
        assert_eq!(daily_caloric_needs(26, 170.0, 58.0, Gender::Female, 5).unwrap(), 2512);
        assert_eq!(daily_caloric_needs(25, 165.0, 58.0, Gender::Female, 5).unwrap(), 2504);
    }

    #[test]
    fn test_daily_caloric_needs_male() {
        // 66 + 13.8 * 70 + 5 * 185 - 6.8 * 25 = 1787, sedentary
        assert_eq!(daily_caloric_needs(25, 185.0, 70.0, Gender::Male, 0).unwrap(), 1787);
    }

    #[test]
    fn test_basal_metabolic_rate() {
        // 655 + 9.6 * 58 + 1.8 * 170 - 4.7 * 26 = 1395.6
        let female = basal_metabolic_rate(26, 170.0, 58.0, Gender::Female).unwrap();
        assert!((female - 1395.6).abs() < 1e-9);

        let male = basal_metabolic_rate(25, 185.0, 70.0, Gender::Male).unwrap();
        assert!((male - 1787.0).abs() < 1e-9);

        assert!(basal_metabolic_rate(25, 0.0, 70.0, Gender::Male).is_err());
        assert!(basal_metabolic_rate(25, 185.0, -70.0, Gender::Female).is_err());
    }

    #[test]
    fn test_daily_caloric_needs_rejects_bad_activity() {
        assert!(daily_caloric_needs(25, 185.0, 70.0, Gender::Male, 9).is_err());
    }

    #[test]
    fn test_gender_parsing() {
        assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        let err = "female".parse::<Gender>().unwrap_err();
        assert!(matches!(err, MetricError::UnsupportedCategory { category: "gender", .. }));
    }

    #[test]
    fn test_body_profile_delegates() {
        let profile = BodyProfile {
            height_cm: 170.0,
            weight_kg: 58.0,
            age: 26,
            gender: Gender::Female,
        };
        assert_eq!(profile.daily_caloric_needs(5).unwrap(), 2512);
        assert_eq!(profile.bmi().unwrap(), 20.1);
    }
}
