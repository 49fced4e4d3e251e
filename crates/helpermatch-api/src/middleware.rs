use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;
use uuid::Uuid;

use helpermatch_types::models::Role;

pub use helpermatch_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_LIFETIME_DAYS: i64 = 30;

/// The caller's identity for this request, if a valid bearer token was sent.
#[derive(Debug, Clone, Default)]
pub struct Session(pub Option<Claims>);

impl Session {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|c| c.sub)
    }
}

/// Extractor for handlers that need a signed-in caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Session>().cloned().unwrap_or_default())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .and_then(|s| s.0.clone())
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Decode the bearer token, if any, into a [`Session`]. A missing or invalid
/// token yields an anonymous session; handlers decide whether that is enough.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .and_then(|auth| match decode_token(&state.jwt_secret, auth.token()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!("Ignoring invalid bearer token: {}", e);
                None
            }
        });

    req.extensions_mut().insert(Session(claims));
    next.run(req).await
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_keeps_identity() {
        let id = Uuid::new_v4();
        let token = create_token("secret", id, "amy@example.com", Role::Employer).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Employer);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_token("secret", Uuid::new_v4(), "amy@example.com", Role::Helper).unwrap();
        assert!(decode_token("another", &token).is_err());
    }
}
