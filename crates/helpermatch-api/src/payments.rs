use axum::{Json, extract::State};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use helpermatch_db::Database;
use helpermatch_types::api::{CheckoutResponse, VerifyPaymentRequest, VerifyPaymentResponse};
use helpermatch_types::models::PublicUser;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::policy::require_viewer;
use crate::settings::helper_price;
use crate::state::{AppState, run_db};
use crate::stripe::StripeClient;
use crate::validation::validate_session_id;

fn payments(state: &AppState) -> ApiResult<&StripeClient> {
    state
        .payments
        .as_ref()
        .ok_or(ApiError::UpstreamUnavailable("Payment service"))
}

pub async fn create_checkout(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<CheckoutResponse>> {
    let client = payments(&state)?;

    let amount = run_db(&state, move |s| {
        require_viewer(&s.db, claims.sub)?;
        helper_price(&s.db, s.default_price_cents)
    })
    .await?;

    let session = client
        .create_checkout_session(claims.sub, amount)
        .await
        .map_err(|e| {
            warn!("Checkout session for {} failed: {:#}", claims.sub, e);
            ApiError::Upstream("Payment provider rejected the checkout request".to_string())
        })?;
    let url = session
        .url
        .ok_or_else(|| ApiError::Upstream("Payment provider returned no checkout URL".to_string()))?;

    info!("Checkout session {} opened for {} ({} cents)", session.id, claims.sub, amount);
    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url,
    }))
}

/// Confirms a checkout session and unlocks both collections for the user it
/// was opened for.
pub async fn verify_payment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<VerifyPaymentRequest>,
) -> ApiResult<Json<VerifyPaymentResponse>> {
    validate_session_id(&req.session_id).map_err(ApiError::Validation)?;
    let client = payments(&state)?;

    let session = client.retrieve_session(&req.session_id).await.map_err(|e| {
        warn!("Retrieving session {} failed: {:#}", req.session_id, e);
        ApiError::Upstream("Could not verify payment".to_string())
    })?;

    if !session.is_paid() {
        return Err(ApiError::Validation("Payment not successful".to_string()));
    }
    let user_id = session
        .user_id()
        .ok_or_else(|| ApiError::Validation("User ID not found in session metadata".to_string()))?;
    if user_id != claims.sub {
        warn!("{} verified session {} opened by {}", claims.sub, session.id, user_id);
    }

    let user = run_db(&state, move |s| {
        apply_successful_payment(&s.db, user_id, Utc::now(), s.membership)
    })
    .await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        user,
    }))
}

/// Grants both capability flags and, when a membership length is
/// configured, sets the expiry to `now + membership`.
pub fn apply_successful_payment(
    db: &Database,
    user_id: Uuid,
    now: DateTime<Utc>,
    membership: Option<Duration>,
) -> ApiResult<PublicUser> {
    let expires_at = membership.map(|length| now + length);
    if !db.grant_premium(user_id, expires_at)? {
        return Err(ApiError::NotFound("User"));
    }

    info!("Premium access granted to {} (expires {:?})", user_id, expires_at);
    let user = db.get_user_by_id(user_id)?.ok_or(ApiError::NotFound("User"))?;
    Ok(PublicUser::from(user))
}

#[cfg(test)]
mod tests {
    use helpermatch_db::NewUser;
    use helpermatch_types::models::{ApprovalStatus, AuthProvider, Role};

    use super::*;

    fn employer(db: &Database) -> Uuid {
        let id = Uuid::new_v4();
        db.create_user(&NewUser {
            id,
            name: "Emma",
            email: "emma@example.com",
            password_hash: Some("hash"),
            role: Role::Employer,
            status: ApprovalStatus::Approved,
            auth_provider: AuthProvider::Password,
            created_at: Utc::now(),
        })
        .unwrap();
        id
    }

    #[test]
    fn payment_grants_both_flags() {
        let db = Database::open_in_memory().unwrap();
        let id = employer(&db);

        let user = apply_successful_payment(&db, id, Utc::now(), None).unwrap();
        assert!(user.can_view_helpers);
        assert!(user.can_view_jobs);
        assert!(user.membership_expires_at.is_none());
    }

    #[test]
    fn membership_length_sets_expiry() {
        let db = Database::open_in_memory().unwrap();
        let id = employer(&db);
        let now = Utc::now();

        let user = apply_successful_payment(&db, id, now, Some(Duration::days(30))).unwrap();
        let expires = user.membership_expires_at.unwrap();
        assert!((expires - (now + Duration::days(30))).num_seconds().abs() < 1);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            apply_successful_payment(&db, Uuid::new_v4(), Utc::now(), None),
            Err(ApiError::NotFound("User"))
        ));
    }
}
