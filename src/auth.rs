// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Authentication
//!
//! JWT access tokens, bcrypt password hashing and bearer-header
//! authentication. Logged-out tokens are tracked by their `jti` in the
//! database until they expire.

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::constants::{auth::BEARER_PREFIX, auth::JWT_SECRET_LENGTH, messages};
use crate::database::Database;
use crate::errors::ApiError;
use crate::logging::AppLogger;
use crate::models::User;

/// JWT claims for an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub username: String,
    pub is_admin: bool,
    /// Unique token id, used for revocation
    pub jti: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued by a password login rather than a refresh
    pub fresh: bool,
}

/// Identity of the caller of an authenticated request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub is_admin: bool,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication manager for JWT tokens and password hashes
#[derive(Clone)]
pub struct AuthManager {
    jwt_secret: Vec<u8>,
    token_expiry_hours: i64,
    password_hash_cost: u32,
}

impl AuthManager {
    pub fn new(jwt_secret: Vec<u8>, token_expiry_hours: i64, password_hash_cost: u32) -> Self {
        Self {
            jwt_secret,
            token_expiry_hours,
            password_hash_cost,
        }
    }

    /// Generate a fresh access token for a user
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let expiry = now + Duration::hours(self.token_expiry_hours);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            is_admin: user.is_admin,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            fresh: true,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.jwt_secret),
        )?;

        Ok(token)
    }

    /// Validate signature and expiry, returning the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.jwt_secret),
            &validation,
        )?;

        Ok(token_data.claims)
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        Ok(bcrypt::hash(password, self.password_hash_cost)?)
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, password_hash)?)
    }

    /// Authenticate a request from its `Authorization` header
    ///
    /// Fails with [`ApiError::Unauthorized`] for a missing or invalid token and
    /// with [`ApiError::TokenRevoked`] for a token that was logged out.
    pub async fn authenticate_request(
        &self,
        auth_header: Option<&str>,
        database: &Database,
    ) -> Result<AuthContext, ApiError> {
        let token = auth_header
            .and_then(|header| header.strip_prefix(BEARER_PREFIX))
            .ok_or_else(|| ApiError::unauthorized(messages::MISSING_TOKEN))?;

        let claims = self.validate_token(token).map_err(|e| {
            AppLogger::log_security_event("invalid_token", "low", &e.to_string(), None);
            ApiError::unauthorized(messages::INVALID_TOKEN)
        })?;

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| ApiError::unauthorized(messages::INVALID_TOKEN))?;

        if database.is_token_revoked(&claims.jti).await? {
            AppLogger::log_security_event("revoked_token", "low", &claims.jti, Some(user_id));
            return Err(ApiError::TokenRevoked);
        }

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| ApiError::unauthorized(messages::INVALID_TOKEN))?;

        Ok(AuthContext {
            user_id,
            username: claims.username,
            is_admin: claims.is_admin,
            jti: claims.jti,
            expires_at,
        })
    }
}

/// Generate a random JWT secret
pub fn generate_jwt_secret() -> Result<[u8; JWT_SECRET_LENGTH]> {
    use ring::rand::{SecureRandom, SystemRandom};

    let rng = SystemRandom::new();
    let mut secret = [0u8; JWT_SECRET_LENGTH];
    rng.fill(&mut secret)
        .map_err(|_| anyhow::anyhow!("Failed to generate JWT secret"))?;
    Ok(secret)
}

/// Load the JWT secret from `path`, generating and saving a new one on first start
pub fn load_or_generate_jwt_secret(path: &Path) -> Result<Vec<u8>> {
    if path.exists() {
        let secret = fs::read(path)?;
        if secret.len() != JWT_SECRET_LENGTH {
            return Err(anyhow::anyhow!(
                "Invalid JWT secret length: expected {} bytes, got {}",
                JWT_SECRET_LENGTH,
                secret.len()
            ));
        }
        return Ok(secret);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let secret = generate_jwt_secret()?;
    fs::write(path, secret)?;
    info!("Generated new JWT secret: {}", path.display());
    Ok(secret.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    fn create_auth_manager() -> AuthManager {
        let secret = generate_jwt_secret().unwrap().to_vec();
        AuthManager::new(secret, 24, 4)
    }

    async fn create_test_user(db: &Database, auth_manager: &AuthManager) -> User {
        let hash = auth_manager.hash_password("password123").unwrap();
        let id = db
            .create_user(&NewUser::regular("runner".to_string(), hash))
            .await
            .unwrap();
        db.get_user(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_generate_and_validate_token() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let auth_manager = create_auth_manager();
        let user = create_test_user(&db, &auth_manager).await;

        let token = auth_manager.generate_token(&user).unwrap();
        let claims = auth_manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "runner");
        assert!(!claims.is_admin);
        assert!(claims.fresh);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_tokens_have_unique_ids() {
        let auth_manager = create_auth_manager();
        let user = User {
            id: 1,
            username: "runner".to_string(),
            password_hash: String::new(),
            is_admin: false,
            is_staff: false,
            created_at: Utc::now().naive_utc(),
            user_profile: None,
        };

        let first = auth_manager.validate_token(&auth_manager.generate_token(&user).unwrap()).unwrap();
        let second = auth_manager.validate_token(&auth_manager.generate_token(&user).unwrap()).unwrap();
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let issuer = create_auth_manager();
        let verifier = create_auth_manager();
        let user = User {
            id: 7,
            username: "other".to_string(),
            password_hash: String::new(),
            is_admin: true,
            is_staff: true,
            created_at: Utc::now().naive_utc(),
            user_profile: None,
        };

        let token = issuer.generate_token(&user).unwrap();
        assert!(verifier.validate_token(&token).is_err());
        assert!(issuer.validate_token("invalid.jwt.token").is_err());
    }

    #[test]
    fn test_password_hashing() {
        let auth_manager = create_auth_manager();
        let hash = auth_manager.hash_password("correct horse").unwrap();

        assert_ne!(hash, "correct horse");
        assert!(auth_manager.verify_password("correct horse", &hash).unwrap());
        assert!(!auth_manager.verify_password("wrong horse", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_authenticate_request() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let auth_manager = create_auth_manager();
        let user = create_test_user(&db, &auth_manager).await;

        let token = auth_manager.generate_token(&user).unwrap();
        let header = format!("Bearer {token}");

        let context = auth_manager.authenticate_request(Some(&header), &db).await.unwrap();
        assert_eq!(context.user_id, user.id);
        assert_eq!(context.username, "runner");
        assert!(context.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_authenticate_request_invalid_header() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let auth_manager = create_auth_manager();

        let result = auth_manager.authenticate_request(None, &db).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));

        let result = auth_manager.authenticate_request(Some("Token abc"), &db).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));

        let result = auth_manager.authenticate_request(Some("Bearer not-a-jwt"), &db).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_jwt_secret_is_generated_once() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("keys").join("jwt.secret");

        let first = load_or_generate_jwt_secret(&path).unwrap();
        assert_eq!(first.len(), JWT_SECRET_LENGTH);
        let second = load_or_generate_jwt_secret(&path).unwrap();
        assert_eq!(first, second);

        fs::write(&path, b"too short").unwrap();
        assert!(load_or_generate_jwt_secret(&path).is_err());
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let auth_manager = create_auth_manager();
        let user = create_test_user(&db, &auth_manager).await;

        let token = auth_manager.generate_token(&user).unwrap();
        let header = format!("Bearer {token}");
        let context = auth_manager.authenticate_request(Some(&header), &db).await.unwrap();

        db.revoke_token(&context.jti, context.expires_at).await.unwrap();

        let result = auth_manager.authenticate_request(Some(&header), &db).await;
        assert!(matches!(result, Err(ApiError::TokenRevoked)));
    }
}
