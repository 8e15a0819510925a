// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Running App
//!
//! A REST backend for runners: accounts, body profiles and logged trainings,
//! plus public calculators and fleet-wide statistics.
//!
//! ## Features
//!
//! - **Training metrics**: average pace, MET lookup and calories burnt,
//!   derived for every stored training
//! - **Body metrics**: BMI, basal metabolic rate and activity-adjusted daily
//!   caloric needs
//! - **Statistics**: total users, kilometres and calories across all trainings
//! - **Accounts**: JWT authentication with server-side logout, admin user
//!   management
//!
//! ## Architecture
//!
//! - **Metrics**: pure calculators with no I/O
//! - **Database**: SQLite storage for users, profiles, trainings and revoked tokens
//! - **Routes**: request handlers returning typed errors
//! - **Server**: warp filter tree mapping HTTP onto the handlers
//!
//! ## Example Usage
//!
//! ```rust
//! use runningapp::metrics::{average_pace, calories_burnt, BodyProfile, Gender};
//!
//! # fn main() -> Result<(), runningapp::errors::MetricError> {
//! let pace = average_pace(3600, 10.0)?;
//! assert_eq!(pace, 10.0);
//! assert_eq!(calories_burnt(70.0, pace, 3600)?, 735);
//!
//! let profile = BodyProfile { height_cm: 170.0, weight_kg: 58.0, age: 26, gender: Gender::Female };
//! assert_eq!(profile.daily_caloric_needs(5)?, 2512);
//! # Ok(())
//! # }
//! ```

/// Metric-calculation engine
pub mod metrics;

/// Calculator and HTTP error types
pub mod errors;

/// Persisted entities and their JSON shape
pub mod models;

/// Application constants and user-visible messages
pub mod constants;

/// Configuration management
pub mod config;

/// SQLite storage
pub mod database;

/// Authentication and password hashing
pub mod auth;

/// Request handlers
pub mod routes;

/// warp filter tree
pub mod server;

/// Production logging and structured output
pub mod logging;

/// Health checks and monitoring
pub mod health;
