use std::sync::Arc;

use tracing::error;

use helpermatch_db::Database;

use crate::error::{ApiError, ApiResult};
use crate::gemini::GeminiClient;
use crate::mailer::{LogMailer, Mailer};
use crate::stripe::StripeClient;

/// HK$388.00
pub const DEFAULT_PRICE_CENTS: i64 = 38_800;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// `None` when no payment key is configured.
    pub payments: Option<StripeClient>,
    /// `None` when no LLM key is configured.
    pub llm: Option<GeminiClient>,
    pub mailer: Arc<dyn Mailer>,
    /// Membership length granted by a successful payment, if any.
    pub membership: Option<chrono::Duration>,
    pub default_price_cents: i64,
}

impl AppStateInner {
    /// State with no external collaborators configured.
    pub fn new(db: Database, jwt_secret: impl Into<String>) -> Self {
        Self {
            db,
            jwt_secret: jwt_secret.into(),
            payments: None,
            llm: None,
            mailer: Arc::new(LogMailer::default()),
            membership: None,
            default_price_cents: DEFAULT_PRICE_CENTS,
        }
    }
}

/// Runs blocking DB work off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppStateInner) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
}
