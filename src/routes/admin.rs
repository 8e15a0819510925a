// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! User management for administrators

use serde::Deserialize;
use tracing::info;

use super::users::UsersResponse;
use super::{validate_password, validate_username, MessageResponse};
use crate::auth::{AuthContext, AuthManager};
use crate::constants::messages;
use crate::database::Database;
use crate::errors::ApiError;
use crate::logging::AppLogger;
use crate::models::{NewUser, User};

#[derive(Debug, Clone, Deserialize)]
pub struct AdminCreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_staff: bool,
}

/// Flags left out keep their stored value
#[derive(Debug, Clone, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub username: String,
    pub password: String,
    pub is_admin: Option<bool>,
    pub is_staff: Option<bool>,
}

#[derive(Clone)]
pub struct AdminRoutes {
    database: Database,
    auth_manager: AuthManager,
}

impl AdminRoutes {
    pub fn new(database: Database, auth_manager: AuthManager) -> Self {
        Self {
            database,
            auth_manager,
        }
    }

    pub async fn list_users(&self, context: &AuthContext) -> Result<UsersResponse, ApiError> {
        require_admin(context, "list users")?;
        Ok(UsersResponse {
            users: self.database.list_users().await?,
        })
    }

    pub async fn create_user(
        &self,
        context: &AuthContext,
        request: AdminCreateUserRequest,
    ) -> Result<MessageResponse, ApiError> {
        require_admin(context, "create user")?;
        validate_username(&request.username)?;
        validate_password(&request.password)?;

        if self.database.get_user_by_username(&request.username).await?.is_some() {
            return Err(ApiError::bad_request(messages::USER_EXISTS));
        }

        let new_user = NewUser {
            username: request.username,
            password_hash: self.auth_manager.hash_password(&request.password)?,
            is_admin: request.is_admin,
            is_staff: request.is_staff,
        };
        let user_id = self.database.create_user(&new_user).await?;
        info!(admin = %context.username, user_id, "Admin created user");

        Ok(MessageResponse::new(messages::USER_CREATED))
    }

    pub async fn get_user(&self, context: &AuthContext, user_id: i64) -> Result<User, ApiError> {
        require_admin(context, "view user")?;
        self.load_user(user_id).await
    }

    /// Change username and password, and optionally promote or demote the user
    pub async fn update_user(
        &self,
        context: &AuthContext,
        user_id: i64,
        request: AdminUpdateUserRequest,
    ) -> Result<User, ApiError> {
        require_admin(context, "update user")?;
        let user = self.load_user(user_id).await?;
        validate_username(&request.username)?;
        validate_password(&request.password)?;

        if let Some(other) = self.database.get_user_by_username(&request.username).await? {
            if other.id != user.id {
                return Err(ApiError::bad_request(messages::USER_EXISTS));
            }
        }

        let password_hash = self.auth_manager.hash_password(&request.password)?;
        self.database
            .update_user(
                user.id,
                &request.username,
                &password_hash,
                request.is_admin.unwrap_or(user.is_admin),
                request.is_staff.unwrap_or(user.is_staff),
            )
            .await?;
        info!(admin = %context.username, user_id, "Admin updated user");

        self.load_user(user.id).await
    }

    pub async fn delete_user(&self, context: &AuthContext, user_id: i64) -> Result<MessageResponse, ApiError> {
        require_admin(context, "delete user")?;
        self.load_user(user_id).await?;

        self.database.delete_user(user_id).await?;
        info!(admin = %context.username, user_id, "Admin deleted user");

        Ok(MessageResponse::new(messages::USER_DELETED))
    }

    async fn load_user(&self, user_id: i64) -> Result<User, ApiError> {
        self.database
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found(messages::USER_NOT_FOUND))
    }
}

fn require_admin(context: &AuthContext, action: &str) -> Result<(), ApiError> {
    if context.is_admin {
        return Ok(());
    }
    AppLogger::log_security_event(
        "admin_required",
        "medium",
        &format!("non-admin attempted to {action}"),
        Some(context.user_id),
    );
    Err(ApiError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::generate_jwt_secret;
    use chrono::{Duration, Utc};

    async fn setup() -> (AdminRoutes, Database, AuthContext, AuthContext) {
        let database = Database::new("sqlite::memory:").await.unwrap();
        let auth_manager = AuthManager::new(generate_jwt_secret().unwrap().to_vec(), 24, 4);

        let admin_id = database
            .create_user(&NewUser::admin("admin".to_string(), "hash".to_string()))
            .await
            .unwrap();
        let user_id = database
            .create_user(&NewUser::regular("runner".to_string(), "hash".to_string()))
            .await
            .unwrap();

        let admin = AuthContext {
            user_id: admin_id,
            username: "admin".to_string(),
            is_admin: true,
            jti: "admin-jti".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        let runner = AuthContext {
            user_id,
            username: "runner".to_string(),
            is_admin: false,
            jti: "runner-jti".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };

        (AdminRoutes::new(database.clone(), auth_manager), database, admin, runner)
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let (routes, _, _, runner) = setup().await;

        assert!(matches!(routes.list_users(&runner).await, Err(ApiError::Forbidden)));
        assert!(matches!(routes.get_user(&runner, runner.user_id).await, Err(ApiError::Forbidden)));
        assert!(matches!(routes.delete_user(&runner, runner.user_id).await, Err(ApiError::Forbidden)));
    }

    #[tokio::test]
    async fn test_admin_creates_and_lists_users() {
        let (routes, database, admin, _) = setup().await;

        routes
            .create_user(
                &admin,
                AdminCreateUserRequest {
                    username: "coach".to_string(),
                    password: "password123".to_string(),
                    is_admin: false,
                    is_staff: true,
                },
            )
            .await
            .unwrap();

        let users = routes.list_users(&admin).await.unwrap().users;
        assert_eq!(users.len(), 3);

        let coach = database.get_user_by_username("coach").await.unwrap().unwrap();
        assert!(coach.is_staff);
        assert!(!coach.is_admin);
        assert!(coach.user_profile.is_some());
    }

    #[tokio::test]
    async fn test_admin_promotes_user() {
        let (routes, _, admin, runner) = setup().await;

        let updated = routes
            .update_user(
                &admin,
                runner.user_id,
                AdminUpdateUserRequest {
                    username: "runner2".to_string(),
                    password: "password123".to_string(),
                    is_admin: Some(true),
                    is_staff: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.username, "runner2");
        assert!(updated.is_admin);
        assert!(!updated.is_staff);
    }

    #[tokio::test]
    async fn test_admin_update_rejects_taken_username() {
        let (routes, _, admin, runner) = setup().await;

        let result = routes
            .update_user(
                &admin,
                runner.user_id,
                AdminUpdateUserRequest {
                    username: "admin".to_string(),
                    password: "password123".to_string(),
                    is_admin: None,
                    is_staff: None,
                },
            )
            .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_admin_deletes_user() {
        let (routes, database, admin, runner) = setup().await;

        routes.delete_user(&admin, runner.user_id).await.unwrap();
        assert!(database.get_user(runner.user_id).await.unwrap().is_none());
        assert!(matches!(
            routes.delete_user(&admin, runner.user_id).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
