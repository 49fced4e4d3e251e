use axum::{Json, extract::State};
use tracing::{debug, warn};

use helpermatch_types::api::{
    JobDescriptionRequest, JobDescriptionResponse, ListQuery, MatchCriteria, MatchRequest,
    MatchResponse,
};
use helpermatch_types::models::HelperProfile;

use crate::error::{ApiError, ApiResult};
use crate::gemini::GeminiClient;
use crate::helpers::visible_helpers;
use crate::middleware::Session;
use crate::policy;
use crate::state::{AppState, run_db};

fn llm(state: &AppState) -> ApiResult<&GeminiClient> {
    state.llm.as_ref().ok_or(ApiError::UpstreamUnavailable("AI service"))
}

/// Asks the model for search criteria, then filters the helpers the caller
/// may already see.
pub async fn smart_match(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<MatchRequest>,
) -> ApiResult<Json<MatchResponse>> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::Validation("Query is required".to_string()));
    }
    let client = llm(&state)?;

    let criteria = client.match_criteria(&query).await.map_err(|e| {
        warn!("AI match failed: {:#}", e);
        ApiError::Upstream("AI processing failed".to_string())
    })?;
    debug!("AI criteria for {:?}: {:?}", query, criteria);

    let filter = criteria.clone();
    let matches = run_db(&state, move |s| {
        let viewer = policy::resolve_viewer(&s.db, session.user_id());
        let helpers = visible_helpers(&s.db, viewer.as_ref(), &ListQuery::default())?;
        Ok(helpers
            .into_iter()
            .filter(|h| matches_criteria(h, &filter))
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(MatchResponse { criteria, matches }))
}

pub async fn job_description(
    State(state): State<AppState>,
    Json(req): Json<JobDescriptionRequest>,
) -> ApiResult<Json<JobDescriptionResponse>> {
    if req.details.trim().is_empty() {
        return Err(ApiError::Validation("Details are required".to_string()));
    }
    let client = llm(&state)?;

    let description = client.job_description(&req.details).await.map_err(|e| {
        warn!("AI job description failed: {:#}", e);
        ApiError::Upstream("AI generation failed".to_string())
    })?;
    Ok(Json(JobDescriptionResponse { description }))
}

/// Same nationality, or at least one shared skill. Case-insensitive.
pub fn matches_criteria(helper: &HelperProfile, criteria: &MatchCriteria) -> bool {
    let nationality = criteria.nationality.trim();
    if !nationality.is_empty() && helper.nationality.trim().eq_ignore_ascii_case(nationality) {
        return true;
    }
    helper.skills.iter().any(|skill| {
        criteria
            .skills
            .iter()
            .any(|wanted| skill.trim().eq_ignore_ascii_case(wanted.trim()))
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use helpermatch_types::models::ModerationStatus;
    use uuid::Uuid;

    use super::*;

    fn helper(nationality: &str, skills: &[&str]) -> HelperProfile {
        HelperProfile {
            id: Uuid::new_v4(),
            user_id: None,
            name: "Maria".to_string(),
            age: 32,
            nationality: nationality.to_string(),
            experience: "Finished Contract".to_string(),
            years_in_hk: Some(4),
            work_experience_type: None,
            salary: 5_000,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            languages: vec!["English".to_string()],
            image_url: String::new(),
            availability: "Immediate".to_string(),
            description: "Caring and reliable".to_string(),
            status: ModerationStatus::Approved,
            created_at: Utc::now(),
        }
    }

    fn criteria(nationality: &str, skills: &[&str]) -> MatchCriteria {
        MatchCriteria {
            nationality: nationality.to_string(),
            experience: "Ex-HK".to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            summary: String::new(),
        }
    }

    #[test]
    fn nationality_or_skill_overlap_matches() {
        let maria = helper("Filipino", &["Cooking", "Elderly Care"]);

        assert!(matches_criteria(&maria, &criteria("filipino", &[])));
        assert!(matches_criteria(&maria, &criteria("Indonesian", &["cooking"])));
        assert!(!matches_criteria(&maria, &criteria("Indonesian", &["Baby Care"])));
        assert!(!matches_criteria(&maria, &criteria("", &[])));
    }
}
