mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use helpermatch_api::auth::{hash_password, normalize_email};
use helpermatch_api::gemini::GeminiClient;
use helpermatch_api::mailer::{LogMailer, Mailer};
use helpermatch_api::state::{AppState, AppStateInner};
use helpermatch_api::stripe::StripeClient;
use helpermatch_db::{Database, NewUser};
use helpermatch_types::models::{ApprovalStatus, AuthProvider, Role};

use config::{AdminSeed, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpermatch=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if !config.has_usable_secret() {
        eprintln!("FATAL: HELPERMATCH_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    // Init database
    let db = Database::open(&config.db_path)?;
    if let Some(seed) = &config.admin {
        seed_admin(&db, seed)?;
    }

    let payments = match &config.stripe_secret_key {
        Some(key) => Some(StripeClient::new(
            key.clone(),
            config.stripe_api_base.clone(),
            config.frontend_url.clone(),
        )?),
        None => {
            warn!("STRIPE_SECRET_KEY not set; payment endpoints are disabled");
            None
        }
    };

    let llm = GeminiClient::from_key(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_api_base.clone(),
    )?;
    if llm.is_none() {
        warn!("GEMINI_API_KEY not set; AI endpoints are disabled");
    }

    let mut inner = AppStateInner::new(db, config.jwt_secret.clone());
    inner.payments = payments;
    inner.llm = llm;
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer {
        frontend_url: config.frontend_url.clone(),
    });
    inner.mailer = mailer;
    inner.membership = config.membership_days.map(chrono::Duration::days);
    inner.default_price_cents = config.default_price_cents;
    let state: AppState = Arc::new(inner);

    let app = helpermatch_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("HelperMatch server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Creates the configured admin account unless the address is already taken.
fn seed_admin(db: &Database, seed: &AdminSeed) -> anyhow::Result<()> {
    let email = normalize_email(&seed.email);
    if let Some(existing) = db.get_user_by_email(&email)? {
        if existing.role != Role::Admin {
            warn!("Admin seed {} exists with role {}; leaving it unchanged", email, existing.role);
        }
        return Ok(());
    }

    let password_hash = hash_password(&seed.password)?;
    db.create_user(&NewUser {
        id: Uuid::new_v4(),
        name: "Administrator",
        email: &email,
        password_hash: Some(&password_hash),
        role: Role::Admin,
        status: ApprovalStatus::Approved,
        auth_provider: AuthProvider::Password,
        created_at: Utc::now(),
    })?;
    info!("Seeded admin account {}", email);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
