use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use helpermatch_db::Database;
use helpermatch_types::api::{HelperInput, ListQuery, MessageOnly, ModerationRequest};
use helpermatch_types::models::{Collection, HelperProfile, ModerationStatus, Role};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{AuthUser, Session};
use crate::policy::{self, Viewer};
use crate::state::{AppState, run_db};
use crate::validation::validate_helper;

/// Helper profiles `viewer` may list. A denied viewer gets an empty list.
pub fn visible_helpers(db: &Database, viewer: Option<&Viewer>, query: &ListQuery) -> ApiResult<Vec<HelperProfile>> {
    match policy::listing_filter(viewer, Collection::Helpers, query) {
        Some(filter) => Ok(db.list_helpers(filter)?),
        None => Ok(Vec::new()),
    }
}

pub async fn list_helpers(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<HelperProfile>>> {
    let helpers = run_db(&state, move |s| {
        let viewer = policy::resolve_viewer(&s.db, session.user_id());
        visible_helpers(&s.db, viewer.as_ref(), &query)
    })
    .await?;
    Ok(Json(helpers))
}

pub async fn get_helper(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<HelperProfile>> {
    let helper = run_db(&state, move |s| {
        let viewer = policy::resolve_viewer(&s.db, session.user_id());
        let helper = s.db.get_helper(id)?.ok_or(ApiError::NotFound("Helper"))?;
        if !policy::can_see_record(viewer.as_ref(), Collection::Helpers, helper.user_id, helper.status) {
            return Err(ApiError::NotFound("Helper"));
        }
        Ok(helper)
    })
    .await?;
    Ok(Json(helper))
}

pub async fn create_helper(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(input): Json<HelperInput>,
) -> ApiResult<impl IntoResponse> {
    validate_helper(&input).map_err(ApiError::Validation)?;

    let helper = run_db(&state, move |s| {
        let viewer = policy::require_viewer(&s.db, claims.sub)?;
        let owner = match viewer.role {
            Role::Admin => input.user_id,
            Role::Helper => Some(viewer.id),
            Role::Employer => return Err(ApiError::AccessDenied),
        };
        if let Some(owner) = owner.filter(|o| *o != viewer.id) {
            s.db.get_user_by_id(owner)?.ok_or(ApiError::NotFound("User"))?;
        }

        let helper = profile_from_input(Uuid::new_v4(), owner, ModerationStatus::Pending, Utc::now(), input);
        s.db.insert_helper(&helper)?;
        info!("Helper profile {} created by {}", helper.id, viewer.id);
        Ok(helper)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(helper)))
}

/// An owner's edit sends the profile back to moderation; an admin's keeps
/// its status.
pub async fn update_helper(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<HelperInput>,
) -> ApiResult<Json<HelperProfile>> {
    validate_helper(&input).map_err(ApiError::Validation)?;

    let helper = run_db(&state, move |s| {
        let viewer = policy::require_viewer(&s.db, claims.sub)?;
        let existing = s.db.get_helper(id)?.ok_or(ApiError::NotFound("Helper"))?;
        if !policy::may_manage(&viewer, existing.user_id) {
            return Err(ApiError::AccessDenied);
        }

        let (owner, status) = if viewer.is_admin() {
            (input.user_id.or(existing.user_id), existing.status)
        } else {
            (existing.user_id, ModerationStatus::Pending)
        };
        if let Some(owner) = owner.filter(|o| Some(*o) != existing.user_id) {
            s.db.get_user_by_id(owner)?.ok_or(ApiError::NotFound("User"))?;
        }

        let helper = profile_from_input(id, owner, status, existing.created_at, input);
        if !s.db.update_helper(&helper)? {
            return Err(ApiError::NotFound("Helper"));
        }
        Ok(helper)
    })
    .await?;
    Ok(Json(helper))
}

pub async fn delete_helper(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageOnly>> {
    run_db(&state, move |s| {
        let viewer = policy::require_viewer(&s.db, claims.sub)?;
        let existing = s.db.get_helper(id)?.ok_or(ApiError::NotFound("Helper"))?;
        if !policy::may_manage(&viewer, existing.user_id) {
            return Err(ApiError::AccessDenied);
        }
        if !s.db.delete_helper(id)? {
            return Err(ApiError::NotFound("Helper"));
        }
        info!("Helper profile {} deleted by {}", id, viewer.id);
        Ok(())
    })
    .await?;

    Ok(Json(MessageOnly {
        message: "Helper deleted successfully".to_string(),
    }))
}

pub async fn moderate_helper(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ModerationRequest>,
) -> ApiResult<Json<HelperProfile>> {
    let helper = run_db(&state, move |s| {
        let admin = policy::require_admin(&s.db, claims.sub)?;
        if !s.db.set_helper_status(id, req.status)? {
            return Err(ApiError::NotFound("Helper"));
        }
        info!("Helper profile {} marked {} by {}", id, req.status, admin.id);
        s.db.get_helper(id)?.ok_or(ApiError::NotFound("Helper"))
    })
    .await?;
    Ok(Json(helper))
}

fn profile_from_input(
    id: Uuid,
    owner: Option<Uuid>,
    status: ModerationStatus,
    created_at: chrono::DateTime<Utc>,
    input: HelperInput,
) -> HelperProfile {
    HelperProfile {
        id,
        user_id: owner,
        name: input.name.trim().to_string(),
        age: input.age,
        nationality: input.nationality,
        experience: input.experience,
        years_in_hk: input.years_in_hk,
        work_experience_type: input.work_experience_type,
        salary: input.salary,
        skills: input.skills,
        languages: input.languages,
        image_url: input.image_url,
        availability: input.availability,
        description: input.description,
        status,
        created_at,
    }
}
