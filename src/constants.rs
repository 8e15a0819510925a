// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Defaults and user-visible messages shared by the storage, auth and route layers.

/// Service identity
pub mod service {
    pub const SERVICE_NAME: &str = "runningapp";

    /// Server version from Cargo.toml
    pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Values a freshly registered user's profile starts with
pub mod profile_defaults {
    pub const AGE: u32 = 25;
    pub const HEIGHT_CM: f64 = 185.0;
    pub const WEIGHT_KG: f64 = 70.0;
}

/// Validation limits for user-supplied fields
pub mod limits {
    pub const USERNAME_MAX_LENGTH: usize = 80;
    pub const TRAINING_NAME_MAX_LENGTH: usize = 80;
    pub const PASSWORD_MIN_LENGTH: usize = 8;
}

/// Authentication defaults
pub mod auth {
    pub const DEFAULT_TOKEN_EXPIRY_HOURS: i64 = 24;
    pub const JWT_SECRET_LENGTH: usize = 64;
    pub const BEARER_PREFIX: &str = "Bearer ";
}

/// Date format used for training dates on the wire
pub const TRAINING_DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Messages returned to clients
pub mod messages {
    pub const USER_CREATED: &str = "User created successfully.";
    pub const USER_LOGGED_IN: &str = "User logged in successfully.";
    pub const USER_LOGGED_OUT: &str = "Successfully logged out.";
    pub const USER_DELETED: &str = "User deleted.";
    pub const USER_NOT_FOUND: &str = "User not found.";
    pub const USER_EXISTS: &str = "A user with that username already exists.";
    pub const PROFILE_NOT_FOUND: &str = "User profile not found.";
    pub const PASSWORD_CHANGED: &str = "Your password has been changed.";
    pub const DAILY_CALORIES_UPDATED: &str = "Daily caloric needs have been updated";
    pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";
    pub const MISSING_TOKEN: &str = "Missing or invalid authorization header.";
    pub const INVALID_TOKEN: &str = "Invalid or expired token.";
    pub const TOKEN_REVOKED: &str = "You have been logged out.";
    pub const PERMISSION_DENIED: &str = "You don't have permission to perform this action.";
    pub const TRAINING_NOT_FOUND: &str = "Training not found.";
    pub const TRAINING_DELETED: &str = "Training deleted";
    pub const INTERNAL_ERROR: &str = "An internal error has occurred.";

    pub fn duplicate_training(name: &str) -> String {
        format!("You have already created a training called {name}. Choose another name.")
    }
}
