//! Bearer-token identity. Tokens are HS256 JWTs whose `sub` is the username
//! recorded as creator, reviewer or lock holder.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// The authenticated user making the request.
#[derive(Debug, Clone)]
pub struct Editor(pub String);

impl Editor {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<AppState> for Editor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized)?;

        let key = DecodingKey::from_secret(state.config().jwt_secret.as_bytes());
        let token = decode::<Claims>(bearer.token(), &key, &Validation::default()).map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            ApiError::Unauthorized
        })?;

        if token.claims.sub.trim().is_empty() {
            return Err(ApiError::Unauthorized);
        }
        Ok(Editor(token.claims.sub))
    }
}
