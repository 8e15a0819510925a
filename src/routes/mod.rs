// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Request handlers
//!
//! Each service holds the collaborators it needs and returns
//! `Result<_, ApiError>`; the HTTP wiring lives in [`crate::server`].

pub mod admin;
pub mod calculator;
pub mod stats;
pub mod trainings;
pub mod users;

pub use admin::AdminRoutes;
pub use stats::StatsRoutes;
pub use trainings::TrainingRoutes;
pub use users::UserRoutes;

use serde::Serialize;

use crate::constants::limits;
use crate::errors::ApiError;

/// `{"message": ...}` body used by endpoints that return no entity
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub(crate) fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() {
        return Err(ApiError::bad_request("Username must not be empty"));
    }
    if username.chars().count() > limits::USERNAME_MAX_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Username must be at most {} characters long",
            limits::USERNAME_MAX_LENGTH
        )));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < limits::PASSWORD_MIN_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters long",
            limits::PASSWORD_MIN_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_validation() {
        assert!(validate_username("runner").is_ok());
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"a".repeat(81)).is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("short").is_err());
    }
}
