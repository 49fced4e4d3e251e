use std::env;
use std::path::PathBuf;

use anyhow::Context;

use helpermatch_api::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};
use helpermatch_api::state::DEFAULT_PRICE_CENTS;

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub frontend_url: String,
    /// Membership length granted by a payment; unlimited when unset.
    pub membership_days: Option<i64>,
    pub default_price_cents: i64,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub admin: Option<AdminSeed>,
}

/// Credentials for an admin account created at startup if missing.
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = var("HELPERMATCH_JWT_SECRET").unwrap_or_default();

        let port = var("HELPERMATCH_PORT")
            .unwrap_or_else(|| "3001".into())
            .parse()
            .context("HELPERMATCH_PORT must be a port number")?;

        let membership_days = var("HELPERMATCH_MEMBERSHIP_DAYS")
            .map(|days| days.parse::<i64>())
            .transpose()
            .context("HELPERMATCH_MEMBERSHIP_DAYS must be a whole number of days")?
            .filter(|days| *days > 0);

        let default_price_cents = var("HELPERMATCH_DEFAULT_PRICE_CENTS")
            .map(|cents| cents.parse::<i64>())
            .transpose()
            .context("HELPERMATCH_DEFAULT_PRICE_CENTS must be a number of cents")?
            .unwrap_or(DEFAULT_PRICE_CENTS);

        let admin = match (var("HELPERMATCH_ADMIN_EMAIL"), var("HELPERMATCH_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };

        Ok(Self {
            host: var("HELPERMATCH_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: PathBuf::from(var("HELPERMATCH_DB_PATH").unwrap_or_else(|| "helpermatch.db".into())),
            jwt_secret,
            frontend_url: var("HELPERMATCH_FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".into()),
            membership_days,
            default_price_cents,
            stripe_secret_key: var("STRIPE_SECRET_KEY"),
            stripe_api_base: var("STRIPE_API_BASE").unwrap_or_else(|| "https://api.stripe.com".into()),
            gemini_api_key: var("GEMINI_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            gemini_api_base: var("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            admin,
        })
    }

    pub fn has_usable_secret(&self) -> bool {
        !self.jwt_secret.is_empty() && !PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

/// Unset and blank variables both read as `None`.
fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
