// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Persisted entities and their JSON shape.
//!
//! - [`User`]: an account, optionally an admin or staff member
//! - [`UserProfile`]: body measurements and running counters, one per user
//! - [`Training`]: one logged run with its derived pace and calories

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use crate::constants::profile_defaults;
use crate::errors::MetricResult;
use crate::metrics::{BodyProfile, Gender, TrainingRecord};

/// A registered account
///
/// The password hash is never serialised.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub is_staff: bool,
    pub created_at: NaiveDateTime,
    /// Populated when the user is loaded together with their profile
    pub user_profile: Option<UserProfile>,
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub is_staff: bool,
}

impl NewUser {
    /// A regular, non-privileged account
    pub fn regular(username: String, password_hash: String) -> Self {
        Self {
            username,
            password_hash,
            is_admin: false,
            is_staff: false,
        }
    }

    /// An account with admin and staff rights
    pub fn admin(username: String, password_hash: String) -> Self {
        Self {
            username,
            password_hash,
            is_admin: true,
            is_staff: true,
        }
    }
}

/// Body measurements and running counters of a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub gender: Gender,
    pub age: u32,
    pub height: f64,
    pub weight: f64,
    pub bmi: f64,
    pub daily_cal: i64,
    pub trainings_number: i64,
    pub kilometers_run: f64,
}

impl UserProfile {
    pub fn body(&self) -> BodyProfile {
        BodyProfile {
            height_cm: self.height,
            weight_kg: self.weight,
            age: self.age,
            gender: self.gender,
        }
    }
}

/// Defaults used when a profile row is created
pub fn default_body() -> BodyProfile {
    BodyProfile {
        height_cm: profile_defaults::HEIGHT_CM,
        weight_kg: profile_defaults::WEIGHT_KG,
        age: profile_defaults::AGE,
        gender: Gender::Male,
    }
}

/// One logged run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Training {
    pub id: i64,
    pub name: String,
    /// Kilometres
    pub distance: f64,
    /// Average pace in km/h
    pub avg_tempo: f64,
    #[serde(with = "training_date")]
    pub date: NaiveDateTime,
    pub time_in_seconds: i64,
    pub calories: i64,
    pub user_id: i64,
}

/// A training before it is stored, with its derived fields already computed
#[derive(Debug, Clone)]
pub struct NewTraining {
    pub name: String,
    pub distance: f64,
    pub avg_tempo: f64,
    pub date: NaiveDateTime,
    pub time_in_seconds: i64,
    pub calories: i64,
    pub user_id: i64,
}

impl NewTraining {
    /// Derive pace then calories for a run by an athlete weighing `weight_kg`
    pub fn derive(
        user_id: i64,
        name: String,
        distance: f64,
        time_in_seconds: i64,
        date: Option<NaiveDateTime>,
        weight_kg: f64,
    ) -> MetricResult<Self> {
        let record = TrainingRecord::new(distance, time_in_seconds, weight_kg)?;
        let calories = record.calories_burnt()?;
        Ok(Self {
            name,
            distance,
            avg_tempo: record.average_pace_kmh,
            date: date.unwrap_or_else(|| Utc::now().naive_utc()),
            time_in_seconds,
            calories,
            user_id,
        })
    }
}

/// `%d-%m-%Y %H:%M:%S` (de)serialisation for training dates
pub mod training_date {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use crate::constants::TRAINING_DATE_FORMAT;

    pub fn serialize<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(TRAINING_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TRAINING_DATE_FORMAT).map_err(serde::de::Error::custom)
    }

    /// Same format for optional request fields
    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => NaiveDateTime::parse_from_str(&raw, TRAINING_DATE_FORMAT)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
