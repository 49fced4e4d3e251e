use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;
use uuid::Uuid;

use helpermatch_db::{UserUpdate, is_unique_violation};
use helpermatch_types::api::{MessageOnly, UpdateUserRequest};
use helpermatch_types::models::PublicUser;

use crate::auth::normalize_email;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::policy::{require_admin, require_viewer};
use crate::state::{AppState, run_db};
use crate::validation::{validate_email, validate_name};

pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = run_db(&state, move |s| {
        require_admin(&s.db, claims.sub)?;
        let users = s.db.list_users()?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    })
    .await?;
    Ok(Json(users))
}

/// A user may read their own record; admins may read any.
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PublicUser>> {
    let user = run_db(&state, move |s| {
        let viewer = require_viewer(&s.db, claims.sub)?;
        if viewer.id != id && !viewer.is_admin() {
            return Err(ApiError::AccessDenied);
        }
        let user = s.db.get_user_by_id(id)?.ok_or(ApiError::NotFound("User"))?;
        Ok(PublicUser::from(user))
    })
    .await?;
    Ok(Json(user))
}

/// Admin edit, including the capability flags. Last writer wins.
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<PublicUser>> {
    validate_name(&req.name).map_err(ApiError::Validation)?;
    let email = normalize_email(&req.email);
    validate_email(&email).map_err(ApiError::Validation)?;

    let user = run_db(&state, move |s| {
        let admin = require_admin(&s.db, claims.sub)?;
        let changed = s
            .db
            .update_user(
                id,
                &UserUpdate {
                    name: req.name.trim(),
                    email: &email,
                    role: req.role,
                    status: req.status,
                    can_view_helpers: req.can_view_helpers,
                    can_view_jobs: req.can_view_jobs,
                    membership_expires_at: req.membership_expires_at,
                },
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::Conflict("Email already exists".to_string())
                } else {
                    ApiError::Database(e)
                }
            })?;
        if !changed {
            return Err(ApiError::NotFound("User"));
        }

        info!(
            "Admin {} updated user {} (helpers={}, jobs={})",
            admin.id, id, req.can_view_helpers, req.can_view_jobs
        );
        let user = s.db.get_user_by_id(id)?.ok_or(ApiError::NotFound("User"))?;
        Ok(PublicUser::from(user))
    })
    .await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageOnly>> {
    run_db(&state, move |s| {
        let admin = require_admin(&s.db, claims.sub)?;
        if !s.db.delete_user(id)? {
            return Err(ApiError::NotFound("User"));
        }
        info!("Admin {} deleted user {}", admin.id, id);
        Ok(())
    })
    .await?;

    Ok(Json(MessageOnly {
        message: "User deleted successfully".to_string(),
    }))
}
