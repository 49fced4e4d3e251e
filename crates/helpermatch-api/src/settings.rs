use axum::{Json, extract::State};
use serde_json::Value;
use tracing::{info, warn};

use helpermatch_db::Database;
use helpermatch_types::api::{PutSettingRequest, SettingsMap};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::policy::require_admin;
use crate::state::{AppState, run_db};

/// Price of the premium unlock, in cents.
pub const HELPER_PRICE_KEY: &str = "helper_price";

pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<SettingsMap>> {
    let settings = run_db(&state, |s| load_settings(&s.db)).await?;
    Ok(Json(settings))
}

pub async fn put_setting(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<PutSettingRequest>,
) -> ApiResult<Json<SettingsMap>> {
    let key = req.key.trim().to_string();
    if key.is_empty() {
        return Err(ApiError::Validation("Setting key is required".to_string()));
    }
    if key == HELPER_PRICE_KEY && !req.value.as_i64().is_some_and(|cents| cents > 0) {
        return Err(ApiError::Validation("helper_price must be a positive number of cents".to_string()));
    }

    let settings = run_db(&state, move |s| {
        let admin = require_admin(&s.db, claims.sub)?;
        s.db.put_setting(&key, &req.value.to_string())?;
        info!("Admin {} set {} = {}", admin.id, key, req.value);
        load_settings(&s.db)
    })
    .await?;
    Ok(Json(settings))
}

pub fn load_settings(db: &Database) -> ApiResult<SettingsMap> {
    Ok(db
        .get_settings()?
        .into_iter()
        .map(|(key, raw)| {
            let value = parse_value(&key, raw);
            (key, value)
        })
        .collect())
}

/// The configured unlock price, falling back to `default_cents` when unset
/// or unusable.
pub fn helper_price(db: &Database, default_cents: i64) -> ApiResult<i64> {
    let price = db
        .get_setting(HELPER_PRICE_KEY)?
        .map(|raw| parse_value(HELPER_PRICE_KEY, raw))
        .and_then(|v| v.as_i64())
        .filter(|cents| *cents > 0);
    Ok(price.unwrap_or(default_cents))
}

/// Values are stored as JSON text; anything else is served as a plain string.
fn parse_value(key: &str, raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or_else(|_| {
        warn!("Setting {} is not valid JSON; serving it as a string", key);
        Value::String(raw)
    })
}
