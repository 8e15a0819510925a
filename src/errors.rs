// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Error Handling
//!
//! Two layers of errors live here:
//!
//! - [`MetricError`] is raised by the pure calculators in [`crate::metrics`].
//!   It knows nothing about HTTP.
//! - [`ApiError`] is what request handlers return. It carries the HTTP status
//!   and the JSON body sent back to the client, and is used as a warp
//!   rejection.

use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;

use crate::constants::messages;

/// Errors raised by the metric-calculation engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    /// A numeric input is out of its domain (non-positive, negative, NaN, out of range)
    #[error("Invalid {field}: {reason}")]
    InvalidInput {
        /// Name of the offending input
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// A categorical input holds a value with no formula attached to it
    #[error("Unsupported {category}: {value}")]
    UnsupportedCategory {
        /// Category name, e.g. `gender`
        category: &'static str,
        /// Value supplied by the caller
        value: String,
    },
}

impl MetricError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for calculator results
pub type MetricResult<T> = Result<T, MetricError>;

/// JSON body returned for every failed request
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: &'static str,
}

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{}", messages::TOKEN_REVOKED)]
    TokenRevoked,

    #[error("{}", messages::PERMISSION_DENIED)]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::TokenRevoked => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::TokenRevoked => "token_revoked",
            ApiError::Forbidden => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// Body sent to the client. Internal details never leave the server.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            ApiError::Internal(_) => messages::INTERNAL_ERROR.to_string(),
            other => other.to_string(),
        };
        ErrorResponse {
            message,
            error: self.code(),
        }
    }
}

impl Reject for ApiError {}

impl From<MetricError> for ApiError {
    fn from(err: MetricError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::Internal(err.into())
    }
}
