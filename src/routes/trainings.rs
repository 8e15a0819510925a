// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Training handlers
//!
//! Pace and calories are never taken from the client: they are derived from
//! distance, duration and the owner's current weight on every create and
//! update.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::MessageResponse;
use crate::auth::AuthContext;
use crate::constants::{limits, messages};
use crate::database::{is_unique_violation, Database};
use crate::errors::ApiError;
use crate::logging::AppLogger;
use crate::models::{training_date, NewTraining, Training};

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingRequest {
    pub name: String,
    /// Kilometres
    pub distance: f64,
    pub time_in_seconds: i64,
    /// Defaults to now on create, and to the stored date on update
    #[serde(default, with = "training_date::option")]
    pub date: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
pub struct TrainingsResponse {
    pub trainings: Vec<Training>,
}

#[derive(Clone)]
pub struct TrainingRoutes {
    database: Database,
}

impl TrainingRoutes {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// The caller's own trainings
    pub async fn list(&self, context: &AuthContext) -> Result<TrainingsResponse, ApiError> {
        Ok(TrainingsResponse {
            trainings: self.database.list_trainings_for_user(context.user_id).await?,
        })
    }

    pub async fn create(&self, context: &AuthContext, request: TrainingRequest) -> Result<Training, ApiError> {
        validate_name(&request.name)?;

        if self
            .database
            .get_training_by_name(context.user_id, &request.name)
            .await?
            .is_some()
        {
            return Err(ApiError::bad_request(messages::duplicate_training(&request.name)));
        }

        let weight_kg = self.owner_weight(context.user_id).await?;
        let new_training = NewTraining::derive(
            context.user_id,
            request.name,
            request.distance,
            request.time_in_seconds,
            request.date,
            weight_kg,
        )?;

        let training = self
            .database
            .create_training(&new_training)
            .await
            .map_err(|e| duplicate_name_error(e, &new_training.name))?;
        AppLogger::log_training_event(
            context.user_id,
            training.id,
            "create",
            training.distance,
            training.calories,
        );

        Ok(training)
    }

    /// Other users' trainings are reported as missing
    pub async fn get(&self, context: &AuthContext, training_id: i64) -> Result<Training, ApiError> {
        match self.database.get_training(training_id).await? {
            Some(training) if training.user_id == context.user_id => Ok(training),
            _ => Err(ApiError::not_found(messages::TRAINING_NOT_FOUND)),
        }
    }

    pub async fn update(
        &self,
        context: &AuthContext,
        training_id: i64,
        request: TrainingRequest,
    ) -> Result<Training, ApiError> {
        let existing = self.owned_training(context, training_id).await?;
        validate_name(&request.name)?;

        if let Some(other) = self
            .database
            .get_training_by_name(context.user_id, &request.name)
            .await?
        {
            if other.id != existing.id {
                return Err(ApiError::bad_request(messages::duplicate_training(&request.name)));
            }
        }

        let weight_kg = self.owner_weight(context.user_id).await?;
        let new_training = NewTraining::derive(
            context.user_id,
            request.name,
            request.distance,
            request.time_in_seconds,
            request.date.or(Some(existing.date)),
            weight_kg,
        )?;

        let training = self
            .database
            .update_training(existing.id, existing.distance, &new_training)
            .await
            .map_err(|e| duplicate_name_error(e, &new_training.name))?;
        AppLogger::log_training_event(
            context.user_id,
            training.id,
            "update",
            training.distance,
            training.calories,
        );

        Ok(training)
    }

    pub async fn delete(&self, context: &AuthContext, training_id: i64) -> Result<MessageResponse, ApiError> {
        let training = self.owned_training(context, training_id).await?;

        self.database.delete_training(&training).await?;
        AppLogger::log_training_event(
            context.user_id,
            training.id,
            "delete",
            training.distance,
            training.calories,
        );

        Ok(MessageResponse::new(messages::TRAINING_DELETED))
    }

    /// 404 when the training does not exist, 403 when it belongs to someone else
    async fn owned_training(&self, context: &AuthContext, training_id: i64) -> Result<Training, ApiError> {
        let training = self
            .database
            .get_training(training_id)
            .await?
            .ok_or_else(|| ApiError::not_found(messages::TRAINING_NOT_FOUND))?;

        if training.user_id != context.user_id {
            AppLogger::log_security_event(
                "permission_denied",
                "medium",
                &format!("attempt to modify training {training_id}"),
                Some(context.user_id),
            );
            return Err(ApiError::Forbidden);
        }

        Ok(training)
    }

    async fn owner_weight(&self, user_id: i64) -> Result<f64, ApiError> {
        let profile = self
            .database
            .get_profile_by_user_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found(messages::PROFILE_NOT_FOUND))?;
        Ok(profile.weight)
    }
}

/// A concurrent write can still hit the UNIQUE(user_id, name) constraint after the pre-check
fn duplicate_name_error(error: anyhow::Error, name: &str) -> ApiError {
    if is_unique_violation(&error) {
        ApiError::bad_request(messages::duplicate_training(name))
    } else {
        ApiError::Internal(error)
    }
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("Training name must not be empty"));
    }
    if name.chars().count() > limits::TRAINING_NAME_MAX_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Training name must be at most {} characters long",
            limits::TRAINING_NAME_MAX_LENGTH
        )));
    }
    Ok(())
}
