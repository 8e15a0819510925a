// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Database Management
//!
//! SQLite storage for users, profiles, trainings and the token revocation list.
//! Writes that touch a training and its owner's running counters happen in a
//! single transaction.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::path::Path;
use std::time::Instant;

use crate::logging::AppLogger;
use crate::metrics::{BodyProfile, Gender, TrainingRecord};
use crate::models::{default_body, NewTraining, NewUser, Training, User, UserProfile};

const USER_COLUMNS: &str = r#"
    SELECT u.id, u.username, u.password_hash, u.is_admin, u.is_staff, u.created_at,
           p.id AS profile_id, p.user_id, p.gender, p.age, p.height, p.weight, p.bmi,
           p.daily_cal, p.trainings_number, p.kilometers_run
    FROM users u
    LEFT JOIN user_profiles p ON p.user_id = u.id
"#;

const PROFILE_COLUMNS: &str = r#"
    SELECT id AS profile_id, user_id, gender, age, height, weight, bmi,
           daily_cal, trainings_number, kilometers_run
    FROM user_profiles
"#;

const TRAINING_COLUMNS: &str = r#"
    SELECT id, name, distance, avg_tempo, date, time_in_seconds, calories, user_id
    FROM trainings
"#;

/// Database manager for users, profiles and trainings
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open a database connection and run migrations
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = if database_url.contains(":memory:") {
            // Every connection to :memory: is a separate database, so keep exactly one alive
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(database_url)
                .await?
        } else {
            if let Some(parent) = sqlite_file_path(database_url).and_then(|path| path.parent()) {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
            }

            // Ensure SQLite creates the database file if it doesn't exist
            let connection_options = if database_url.contains('?') {
                database_url.to_string()
            } else {
                format!("{database_url}?mode=rwc")
            };
            SqlitePool::connect(&connection_options)
                .await
                .with_context(|| format!("Failed to open database {database_url}"))?
        };

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Create tables if they don't exist
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                is_admin BOOLEAN NOT NULL DEFAULT 0,
                is_staff BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER UNIQUE NOT NULL REFERENCES users(id),
                gender TEXT NOT NULL DEFAULT 'Male' CHECK (gender IN ('Male', 'Female')),
                age INTEGER NOT NULL DEFAULT 25,
                height REAL NOT NULL DEFAULT 185,
                weight REAL NOT NULL DEFAULT 70,
                bmi REAL NOT NULL DEFAULT 0,
                daily_cal INTEGER NOT NULL DEFAULT 0,
                trainings_number INTEGER NOT NULL DEFAULT 0,
                kilometers_run REAL NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trainings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                distance REAL NOT NULL,
                avg_tempo REAL NOT NULL,
                date TEXT NOT NULL,
                time_in_seconds INTEGER NOT NULL,
                calories INTEGER NOT NULL DEFAULT 0,
                user_id INTEGER NOT NULL REFERENCES users(id),
                UNIQUE (user_id, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trainings_user ON trainings(user_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS revoked_tokens (
                jti TEXT PRIMARY KEY,
                expires_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Cheap round trip used by health checks
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------------

    /// Create a user together with a default profile, returning the user id
    pub async fn create_user(&self, user: &NewUser) -> Result<i64> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, is_admin, is_staff, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.is_staff)
        .bind(Utc::now().naive_utc())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let body = default_body();
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, gender, age, height, weight)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(user_id)
        .bind(body.gender.as_str())
        .bind(i64::from(body.age))
        .bind(body.height_cm)
        .bind(body.weight_kg)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        AppLogger::log_database_operation("insert", "users", true, elapsed_ms(start));

        Ok(user_id)
    }

    /// Get user by ID, with their profile
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("{USER_COLUMNS} WHERE u.id = ?1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_user(&row)).transpose()
    }

    /// Get user by username, with their profile
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("{USER_COLUMNS} WHERE u.username = ?1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_user(&row)).transpose()
    }

    /// All users ordered by id
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!("{USER_COLUMNS} ORDER BY u.id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_user).collect()
    }

    pub async fn count_users(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    /// Overwrite the account fields an admin can change
    pub async fn update_user(
        &self,
        user_id: i64,
        username: &str,
        password_hash: &str,
        is_admin: bool,
        is_staff: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = ?1, password_hash = ?2, is_admin = ?3, is_staff = ?4
            WHERE id = ?5
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(is_admin)
        .bind(is_staff)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a user with their profile and trainings. Returns false if no such user.
    pub async fn delete_user(&self, user_id: i64) -> Result<bool> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM trainings WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_profiles WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        AppLogger::log_database_operation("delete", "users", deleted > 0, elapsed_ms(start));

        Ok(deleted > 0)
    }

    // ---------------------------------------------------------------------
    // Profiles
    // ---------------------------------------------------------------------

    pub async fn get_profile(&self, profile_id: i64) -> Result<Option<UserProfile>> {
        let row = sqlx::query(&format!("{PROFILE_COLUMNS} WHERE id = ?1"))
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_profile(&row),
            None => Ok(None),
        }
    }

    pub async fn get_profile_by_user_id(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let row = sqlx::query(&format!("{PROFILE_COLUMNS} WHERE user_id = ?1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_profile(&row),
            None => Ok(None),
        }
    }

    /// Store new body measurements and the BMI derived from them
    pub async fn update_profile_body(&self, profile_id: i64, body: &BodyProfile, bmi: f64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE user_profiles
            SET gender = ?1, age = ?2, height = ?3, weight = ?4, bmi = ?5
            WHERE id = ?6
            "#,
        )
        .bind(body.gender.as_str())
        .bind(i64::from(body.age))
        .bind(body.height_cm)
        .bind(body.weight_kg)
        .bind(bmi)
        .bind(profile_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_daily_calories(&self, user_id: i64, daily_cal: i64) -> Result<()> {
        sqlx::query("UPDATE user_profiles SET daily_cal = ?1 WHERE user_id = ?2")
            .bind(daily_cal)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Trainings
    // ---------------------------------------------------------------------

    /// Insert a training and bump its owner's counters
    pub async fn create_training(&self, training: &NewTraining) -> Result<Training> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO trainings (name, distance, avg_tempo, date, time_in_seconds, calories, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&training.name)
        .bind(training.distance)
        .bind(training.avg_tempo)
        .bind(training.date)
        .bind(training.time_in_seconds)
        .bind(training.calories)
        .bind(training.user_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            r#"
            UPDATE user_profiles
            SET trainings_number = trainings_number + 1, kilometers_run = kilometers_run + ?1
            WHERE user_id = ?2
            "#,
        )
        .bind(training.distance)
        .bind(training.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        AppLogger::log_database_operation("insert", "trainings", true, elapsed_ms(start));

        Ok(stored_training(id, training))
    }

    pub async fn get_training(&self, training_id: i64) -> Result<Option<Training>> {
        let row = sqlx::query(&format!("{TRAINING_COLUMNS} WHERE id = ?1"))
            .bind(training_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_training(&row)).transpose()
    }

    pub async fn get_training_by_name(&self, user_id: i64, name: &str) -> Result<Option<Training>> {
        let row = sqlx::query(&format!("{TRAINING_COLUMNS} WHERE user_id = ?1 AND name = ?2"))
            .bind(user_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_training(&row)).transpose()
    }

    pub async fn list_trainings_for_user(&self, user_id: i64) -> Result<Vec<Training>> {
        let rows = sqlx::query(&format!("{TRAINING_COLUMNS} WHERE user_id = ?1 ORDER BY id"))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_training).collect()
    }

    /// Replace a training's fields and move its owner's distance counter by the difference
    pub async fn update_training(
        &self,
        training_id: i64,
        previous_distance: f64,
        training: &NewTraining,
    ) -> Result<Training> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE trainings
            SET name = ?1, distance = ?2, avg_tempo = ?3, date = ?4, time_in_seconds = ?5, calories = ?6
            WHERE id = ?7
            "#,
        )
        .bind(&training.name)
        .bind(training.distance)
        .bind(training.avg_tempo)
        .bind(training.date)
        .bind(training.time_in_seconds)
        .bind(training.calories)
        .bind(training_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE user_profiles
            SET kilometers_run = kilometers_run - ?1 + ?2
            WHERE user_id = ?3
            "#,
        )
        .bind(previous_distance)
        .bind(training.distance)
        .bind(training.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        AppLogger::log_database_operation("update", "trainings", true, elapsed_ms(start));

        Ok(stored_training(training_id, training))
    }

    /// Delete a training and roll back its owner's counters
    pub async fn delete_training(&self, training: &Training) -> Result<()> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM trainings WHERE id = ?1")
            .bind(training.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE user_profiles
            SET trainings_number = trainings_number - 1, kilometers_run = kilometers_run - ?1
            WHERE user_id = ?2
            "#,
        )
        .bind(training.distance)
        .bind(training.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        AppLogger::log_database_operation("delete", "trainings", true, elapsed_ms(start));

        Ok(())
    }

    /// Snapshot of every training as calculator input, weighted by its owner's current weight
    pub async fn training_records(&self) -> Result<Vec<TrainingRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.distance, t.time_in_seconds, t.avg_tempo, p.weight
            FROM trainings t
            LEFT JOIN user_profiles p ON p.user_id = t.user_id
            ORDER BY t.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id")?;
                let weight: Option<f64> = row.try_get("weight")?;
                let weight_kg =
                    weight.with_context(|| format!("Training {id} has no owner profile"))?;
                Ok(TrainingRecord {
                    distance_km: row.try_get("distance")?,
                    duration_seconds: row.try_get("time_in_seconds")?,
                    average_pace_kmh: row.try_get("avg_tempo")?,
                    weight_kg,
                })
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Token revocation
    // ---------------------------------------------------------------------

    pub async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?1, ?2)")
            .bind(jti)
            .bind(expires_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn is_token_revoked(&self, jti: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM revoked_tokens WHERE jti = ?1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Drop revocation entries for tokens that have expired anyway
    pub async fn purge_expired_revocations(&self) -> Result<u64> {
        let rows = sqlx::query("SELECT jti, expires_at FROM revoked_tokens")
            .fetch_all(&self.pool)
            .await?;

        let now = Utc::now();
        let mut purged = 0;
        for row in rows {
            let jti: String = row.try_get("jti")?;
            let expires_at: String = row.try_get("expires_at")?;
            let expires_at = DateTime::parse_from_rfc3339(&expires_at)?.with_timezone(&Utc);
            if expires_at < now {
                purged += sqlx::query("DELETE FROM revoked_tokens WHERE jti = ?1")
                    .bind(jti)
                    .execute(&self.pool)
                    .await?
                    .rows_affected();
            }
        }

        Ok(purged)
    }
}

/// Whether a storage error is a UNIQUE constraint violation
pub fn is_unique_violation(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<sqlx::Error>()
        .and_then(|error| error.as_database_error())
        .is_some_and(|db_error| db_error.is_unique_violation())
}

/// Filesystem path of a `sqlite:` URL, without its query string
fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    (!path.is_empty()).then(|| Path::new(path))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn stored_training(id: i64, training: &NewTraining) -> Training {
    Training {
        id,
        name: training.name.clone(),
        distance: training.distance,
        avg_tempo: training.avg_tempo,
        date: training.date,
        time_in_seconds: training.time_in_seconds,
        calories: training.calories,
        user_id: training.user_id,
    }
}

/// Convert a joined user/profile row to a User
fn row_to_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        is_admin: row.try_get("is_admin")?,
        is_staff: row.try_get("is_staff")?,
        created_at: row.try_get::<NaiveDateTime, _>("created_at")?,
        user_profile: row_to_profile(row)?,
    })
}

/// Convert the profile columns of a row, `None` when the join found no profile
fn row_to_profile(row: &SqliteRow) -> Result<Option<UserProfile>> {
    let profile_id: Option<i64> = row.try_get("profile_id")?;
    let Some(id) = profile_id else {
        return Ok(None);
    };

    let gender: String = row.try_get("gender")?;
    let age: i64 = row.try_get("age")?;

    Ok(Some(UserProfile {
        id,
        user_id: row.try_get("user_id")?,
        gender: gender.parse::<Gender>()?,
        age: u32::try_from(age).with_context(|| format!("Invalid stored age {age}"))?,
        height: row.try_get("height")?,
        weight: row.try_get("weight")?,
        bmi: row.try_get("bmi")?,
        daily_cal: row.try_get("daily_cal")?,
        trainings_number: row.try_get("trainings_number")?,
        kilometers_run: row.try_get("kilometers_run")?,
    }))
}

fn row_to_training(row: &SqliteRow) -> Result<Training> {
    Ok(Training {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        distance: row.try_get("distance")?,
        avg_tempo: row.try_get("avg_tempo")?,
        date: row.try_get::<NaiveDateTime, _>("date")?,
        time_in_seconds: row.try_get("time_in_seconds")?,
        calories: row.try_get("calories")?,
        user_id: row.try_get("user_id")?,
    })
}
