use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use helpermatch_db::{NewUser, is_unique_violation};
use helpermatch_types::api::{LoginRequest, RegisterRequest, SessionResponse};
use helpermatch_types::models::{ApprovalStatus, AuthProvider, PublicUser, Role};

use crate::error::{ApiError, ApiResult};
use crate::middleware::create_token;
use crate::state::{AppState, run_db};
use crate::validation::{validate_email, validate_name, validate_password};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_name(&req.name).map_err(ApiError::Validation)?;
    let email = normalize_email(&req.email);
    validate_email(&email).map_err(ApiError::Validation)?;
    validate_password(&req.password).map_err(ApiError::Validation)?;
    if req.role == Role::Admin {
        return Err(ApiError::Validation("Role must be employer or helper".to_string()));
    }

    let user = run_db(&state, move |s| {
        if s.db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("Email already exists".to_string()));
        }

        // Hash password with Argon2id
        let password_hash = hash_password(&req.password)?;

        let id = Uuid::new_v4();
        s.db
            .create_user(&NewUser {
                id,
                name: req.name.trim(),
                email: &email,
                password_hash: Some(&password_hash),
                role: req.role,
                status: ApprovalStatus::Approved,
                auth_provider: AuthProvider::Password,
                created_at: Utc::now(),
            })
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::Conflict("Email already exists".to_string())
                } else {
                    ApiError::Database(e)
                }
            })?;

        if let Err(e) = s.mailer.send_welcome(&email, req.name.trim()) {
            warn!("Failed to send welcome mail to {}: {:#}", email, e);
        }

        let user = s.db.get_user_by_id(id)?.ok_or(ApiError::Internal)?;
        Ok(PublicUser::from(user))
    })
    .await?;

    info!("Registered {} as {}", user.email, user.role);
    let token = create_token(&state.jwt_secret, user.id, &user.email, user.role)?;
    Ok((StatusCode::CREATED, Json(SessionResponse { user, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let email = normalize_email(&req.email);

    let user = run_db(&state, move |s| {
        let user = s.db.get_user_by_email(&email)?.ok_or(ApiError::Unauthorized)?;
        // Google-only accounts have no password to check against.
        let stored = user.password.as_deref().ok_or(ApiError::Unauthorized)?;
        if !verify_password(&req.password, stored)? {
            return Err(ApiError::Unauthorized);
        }
        Ok(PublicUser::from(user))
    })
    .await?;

    let token = create_token(&state.jwt_secret, user.id, &user.email, user.role)?;
    Ok(Json(SessionResponse { user, token }))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on a mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("Corrupt password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
