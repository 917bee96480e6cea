//! Bearer authentication at the interface boundary.
//!
//! Identity provisioning is external; this extractor only validates an
//! HS256 bearer token and resolves the `sub` claim to a user id.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use clipforge_models::UserId;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("malformed authorization header"))?;

        let key = DecodingKey::from_secret(state.config.jwt_secret.as_bytes());
        let data = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
            .map_err(|e| ApiError::unauthorized(format!("invalid token: {e}")))?;

        let user_id = UserId::parse(&data.claims.sub)
            .map_err(|_| ApiError::unauthorized("invalid subject claim"))?;

        Ok(CurrentUser(user_id))
    }
}
