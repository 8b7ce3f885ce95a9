//! Session tokens, password hashing and the authentication extractors.
//!
//! Tokens are HS256 JWTs carrying the user id and email. A token is accepted
//! when its signature and expiry check out and its user still exists; the
//! existence check is cached per user id.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use model::entities::user;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::error::ApiError;
use crate::schemas::AppState;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys plus token lifetime.
#[derive(Clone)]
pub struct AuthKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    ttl: Duration,
}

impl fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl AuthKeys {
    pub fn from_secret(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user_id: i32, email: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            id: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                ApiError::unauthorized("Invalid or expired token")
            })
    }
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

/// False on mismatch or on a malformed stored hash.
pub async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// User identity attached to a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub cpf: String,
}

impl From<user::Model> for SessionUser {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            cpf: model.cpf,
        }
    }
}

/// Extractor for routes that require a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionUser);

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }

    /// Rejects requests that name a user other than the token's.
    pub fn ensure_same(&self, usuario_id: i32) -> Result<(), ApiError> {
        if usuario_id != self.0.id {
            warn!(
                "User {} attempted to act on behalf of user {}",
                self.0.id, usuario_id
            );
            return Err(ApiError::unauthorized("Token does not belong to this user"));
        }
        Ok(())
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;
        let claims = state.auth.verify(token)?;

        if let Some(user) = state.cache.get(&claims.id).await {
            trace!("Session cache hit for user {}", claims.id);
            return Ok(AuthUser(user));
        }

        let user = user::Entity::find_by_id(claims.id)
            .one(&state.db)
            .await?
            .ok_or_else(|| {
                warn!("Token for deleted user {}", claims.id);
                ApiError::unauthorized("Invalid or expired token")
            })?;

        let session = SessionUser::from(user);
        state.cache.insert(session.id, session.clone()).await;
        Ok(AuthUser(session))
    }
}

/// Extractor for routes only available without a session.
#[derive(Debug, Clone, Copy)]
pub struct Guest;

#[axum::async_trait]
impl FromRequestParts<AppState> for Guest {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers).map(|token| state.auth.verify(token)) {
            Some(Ok(claims)) => {
                debug!("Guest-only route called by user {}", claims.id);
                Err(ApiError::Validation("Already authenticated".to_string()))
            }
            _ => Ok(Guest),
        }
    }
}
