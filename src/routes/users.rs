// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Account and profile handlers: registration, login, logout, password
//! changes and profile updates

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{validate_password, validate_username, MessageResponse};
use crate::auth::{AuthContext, AuthManager};
use crate::constants::messages;
use crate::database::Database;
use crate::errors::ApiError;
use crate::logging::AppLogger;
use crate::metrics::{BodyProfile, Gender};
use crate::models::{NewUser, User, UserProfile};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by both registration and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub access_token: String,
    pub username: String,
    /// User ID
    pub user: i64,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub gender: String,
    pub age: u32,
    pub height: f64,
    pub weight: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDailyCaloriesRequest {
    pub daily_cal: i64,
}

#[derive(Debug, Serialize)]
pub struct DailyCaloriesResponse {
    pub message: String,
    pub daily_cal: i64,
}

#[derive(Clone)]
pub struct UserRoutes {
    database: Database,
    auth_manager: AuthManager,
}

impl UserRoutes {
    pub fn new(database: Database, auth_manager: AuthManager) -> Self {
        Self {
            database,
            auth_manager,
        }
    }

    /// Handle user registration
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ApiError> {
        info!("User registration attempt for username: {}", request.username);

        validate_username(&request.username)?;
        validate_password(&request.password)?;

        if self.database.get_user_by_username(&request.username).await?.is_some() {
            AppLogger::log_auth_event(&request.username, "register", false, Some("duplicate username"));
            return Err(ApiError::bad_request(messages::USER_EXISTS));
        }

        let password_hash = self.auth_manager.hash_password(&request.password)?;
        let user_id = self
            .database
            .create_user(&NewUser::regular(request.username.clone(), password_hash))
            .await?;
        let user = self.load_user(user_id).await?;

        let access_token = self.auth_manager.generate_token(&user)?;
        AppLogger::log_auth_event(&user.username, "register", true, None);

        Ok(AuthResponse {
            message: messages::USER_CREATED.to_string(),
            access_token,
            username: user.username,
            user: user.id,
        })
    }

    /// Handle user login
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ApiError> {
        let user = match self.database.get_user_by_username(&request.username).await? {
            Some(user) if self.auth_manager.verify_password(&request.password, &user.password_hash)? => user,
            _ => {
                AppLogger::log_auth_event(&request.username, "login", false, Some("invalid credentials"));
                return Err(ApiError::unauthorized(messages::INVALID_CREDENTIALS));
            }
        };

        let access_token = self.auth_manager.generate_token(&user)?;
        AppLogger::log_auth_event(&user.username, "login", true, None);

        Ok(AuthResponse {
            message: messages::USER_LOGGED_IN.to_string(),
            access_token,
            username: user.username,
            user: user.id,
        })
    }

    /// Revoke the token the request was made with
    pub async fn logout(&self, context: &AuthContext) -> Result<MessageResponse, ApiError> {
        self.database.revoke_token(&context.jti, context.expires_at).await?;
        AppLogger::log_auth_event(&context.username, "logout", true, None);
        Ok(MessageResponse::new(messages::USER_LOGGED_OUT))
    }

    pub async fn change_password(
        &self,
        context: &AuthContext,
        request: ChangePasswordRequest,
    ) -> Result<MessageResponse, ApiError> {
        let user = self.load_user(context.user_id).await?;

        if !self.auth_manager.verify_password(&request.old_password, &user.password_hash)? {
            AppLogger::log_auth_event(&user.username, "change_password", false, Some("wrong old password"));
            return Err(ApiError::unauthorized(messages::INVALID_CREDENTIALS));
        }
        validate_password(&request.new_password)?;

        let password_hash = self.auth_manager.hash_password(&request.new_password)?;
        self.database.update_password(user.id, &password_hash).await?;
        AppLogger::log_auth_event(&user.username, "change_password", true, None);

        Ok(MessageResponse::new(messages::PASSWORD_CHANGED))
    }

    pub async fn list_users(&self) -> Result<UsersResponse, ApiError> {
        Ok(UsersResponse {
            users: self.database.list_users().await?,
        })
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, ApiError> {
        self.load_user(user_id).await
    }

    /// Users may only delete their own account
    pub async fn delete_user(&self, context: &AuthContext, user_id: i64) -> Result<MessageResponse, ApiError> {
        self.load_user(user_id).await?;

        if context.user_id != user_id {
            AppLogger::log_security_event(
                "permission_denied",
                "medium",
                &format!("attempt to delete user {user_id}"),
                Some(context.user_id),
            );
            return Err(ApiError::Forbidden);
        }

        self.database.delete_user(user_id).await?;
        self.database.revoke_token(&context.jti, context.expires_at).await?;
        AppLogger::log_auth_event(&context.username, "delete_account", true, None);

        Ok(MessageResponse::new(messages::USER_DELETED))
    }

    /// Store new body measurements on the caller's own profile and recompute BMI
    pub async fn update_profile(
        &self,
        context: &AuthContext,
        profile_id: i64,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, ApiError> {
        let profile = self
            .database
            .get_profile(profile_id)
            .await?
            .ok_or_else(|| ApiError::not_found(messages::PROFILE_NOT_FOUND))?;

        if profile.user_id != context.user_id {
            AppLogger::log_security_event(
                "permission_denied",
                "medium",
                &format!("attempt to update profile {profile_id}"),
                Some(context.user_id),
            );
            return Err(ApiError::Forbidden);
        }

        let body = BodyProfile {
            height_cm: request.height,
            weight_kg: request.weight,
            age: request.age,
            gender: request.gender.parse::<Gender>()?,
        };
        let bmi = body.bmi()?;

        self.database.update_profile_body(profile.id, &body, bmi).await?;
        info!(user_id = context.user_id, bmi, "Profile updated");

        self.database
            .get_profile(profile.id)
            .await?
            .ok_or_else(|| ApiError::not_found(messages::PROFILE_NOT_FOUND))
    }

    /// Save a chosen value as the caller's daily caloric needs
    pub async fn update_daily_calories(
        &self,
        context: &AuthContext,
        request: UpdateDailyCaloriesRequest,
    ) -> Result<DailyCaloriesResponse, ApiError> {
        if request.daily_cal < 0 {
            return Err(ApiError::bad_request("Daily calories must not be negative"));
        }

        self.database
            .get_profile_by_user_id(context.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found(messages::PROFILE_NOT_FOUND))?;
        self.database
            .update_daily_calories(context.user_id, request.daily_cal)
            .await?;

        Ok(DailyCaloriesResponse {
            message: messages::DAILY_CALORIES_UPDATED.to_string(),
            daily_cal: request.daily_cal,
        })
    }

    async fn load_user(&self, user_id: i64) -> Result<User, ApiError> {
        self.database
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found(messages::USER_NOT_FOUND))
    }
}
