use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use helpermatch_db::Database;
use helpermatch_types::api::{JobInput, ListQuery, MessageOnly, ModerationRequest};
use helpermatch_types::models::{Collection, JobPost, ModerationStatus, Role};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{AuthUser, Session};
use crate::policy::{self, Viewer};
use crate::state::{AppState, run_db};
use crate::validation::validate_job;

pub fn visible_jobs(db: &Database, viewer: Option<&Viewer>, query: &ListQuery) -> ApiResult<Vec<JobPost>> {
    match policy::listing_filter(viewer, Collection::Jobs, query) {
        Some(filter) => Ok(db.list_jobs(filter)?),
        None => Ok(Vec::new()),
    }
}

pub async fn list_jobs(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<JobPost>>> {
    let jobs = run_db(&state, move |s| {
        let viewer = policy::resolve_viewer(&s.db, session.user_id());
        visible_jobs(&s.db, viewer.as_ref(), &query)
    })
    .await?;
    Ok(Json(jobs))
}

pub async fn get_job(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobPost>> {
    let job = run_db(&state, move |s| {
        let viewer = policy::resolve_viewer(&s.db, session.user_id());
        let job = s.db.get_job(id)?.ok_or(ApiError::NotFound("Job"))?;
        if !policy::can_see_record(viewer.as_ref(), Collection::Jobs, job.user_id, job.status) {
            return Err(ApiError::NotFound("Job"));
        }
        Ok(job)
    })
    .await?;
    Ok(Json(job))
}

pub async fn create_job(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(input): Json<JobInput>,
) -> ApiResult<impl IntoResponse> {
    validate_job(&input).map_err(ApiError::Validation)?;

    let job = run_db(&state, move |s| {
        let viewer = policy::require_viewer(&s.db, claims.sub)?;
        let owner = match viewer.role {
            Role::Admin => input.user_id,
            Role::Employer => Some(viewer.id),
            Role::Helper => return Err(ApiError::AccessDenied),
        };
        if let Some(owner) = owner.filter(|o| *o != viewer.id) {
            s.db.get_user_by_id(owner)?.ok_or(ApiError::NotFound("User"))?;
        }

        let job = job_from_input(Uuid::new_v4(), owner, ModerationStatus::Pending, Utc::now(), input);
        s.db.insert_job(&job)?;
        info!("Job {} posted by {}", job.id, viewer.id);
        Ok(job)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn update_job(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<JobInput>,
) -> ApiResult<Json<JobPost>> {
    validate_job(&input).map_err(ApiError::Validation)?;

    let job = run_db(&state, move |s| {
        let viewer = policy::require_viewer(&s.db, claims.sub)?;
        let existing = s.db.get_job(id)?.ok_or(ApiError::NotFound("Job"))?;
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

        let job = job_from_input(id, owner, status, existing.created_at, input);
        if !s.db.update_job(&job)? {
            return Err(ApiError::NotFound("Job"));
        }
        Ok(job)
    })
    .await?;
    Ok(Json(job))
}

pub async fn delete_job(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageOnly>> {
    run_db(&state, move |s| {
        let viewer = policy::require_viewer(&s.db, claims.sub)?;
        let existing = s.db.get_job(id)?.ok_or(ApiError::NotFound("Job"))?;
        if !policy::may_manage(&viewer, existing.user_id) {
            return Err(ApiError::AccessDenied);
        }
        if !s.db.delete_job(id)? {
            return Err(ApiError::NotFound("Job"));
        }
        info!("Job {} deleted by {}", id, viewer.id);
        Ok(())
    })
    .await?;

    Ok(Json(MessageOnly {
        message: "Job deleted successfully".to_string(),
    }))
}

pub async fn moderate_job(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ModerationRequest>,
) -> ApiResult<Json<JobPost>> {
    let job = run_db(&state, move |s| {
        let admin = policy::require_admin(&s.db, claims.sub)?;
        if !s.db.set_job_status(id, req.status)? {
            return Err(ApiError::NotFound("Job"));
        }
        info!("Job {} marked {} by {}", id, req.status, admin.id);
        s.db.get_job(id)?.ok_or(ApiError::NotFound("Job"))
    })
    .await?;
    Ok(Json(job))
}

fn job_from_input(
    id: Uuid,
    owner: Option<Uuid>,
    status: ModerationStatus,
    created_at: DateTime<Utc>,
    input: JobInput,
) -> JobPost {
    JobPost {
        id,
        user_id: owner,
        title: input.title.trim().to_string(),
        location: input.location,
        salary: input.salary,
        requirements: input.requirements,
        description: input.description,
        expiry_date: input.expiry_date,
        status,
        created_at,
    }
}
