//! Minimal Stripe Checkout client.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

const PRODUCT_NAME: &str = "Premium Access - View All Helpers";
const PRODUCT_DESCRIPTION: &str = "Unlocks full access to helper profiles";

pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
    frontend_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// The user the session was opened for, if recorded and well-formed.
    pub fn user_id(&self) -> Option<Uuid> {
        self.metadata.get("user_id").and_then(|id| id.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: String,
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: String, frontend_url: String) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self {
            client,
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        amount_cents: i64,
    ) -> anyhow::Result<CheckoutSession> {
        let params = checkout_params(&self.frontend_url, user_id, amount_cents);
        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn retrieve_session(&self, session_id: &str) -> anyhow::Result<CheckoutSession> {
        let resp = self
            .client
            .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        parse_response(resp).await
    }
}

async fn parse_response(resp: reqwest::Response) -> anyhow::Result<CheckoutSession> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let message = match resp.json::<StripeErrorBody>().await {
        Ok(body) => body.error.message,
        Err(_) => format!("HTTP {}", status),
    };
    anyhow::bail!("Stripe request failed: {}", message)
}

/// Form parameters for a one-off HKD card payment.
fn checkout_params(frontend_url: &str, user_id: Uuid, amount_cents: i64) -> Vec<(&'static str, String)> {
    vec![
        ("mode", "payment".to_string()),
        ("payment_method_types[]", "card".to_string()),
        ("line_items[0][quantity]", "1".to_string()),
        ("line_items[0][price_data][currency]", "hkd".to_string()),
        ("line_items[0][price_data][unit_amount]", amount_cents.to_string()),
        ("line_items[0][price_data][product_data][name]", PRODUCT_NAME.to_string()),
        (
            "line_items[0][price_data][product_data][description]",
            PRODUCT_DESCRIPTION.to_string(),
        ),
        (
            "success_url",
            format!("{}/payment/success?session_id={{CHECKOUT_SESSION_ID}}", frontend_url),
        ),
        ("cancel_url", format!("{}/payment/cancel", frontend_url)),
        ("metadata[user_id]", user_id.to_string()),
        ("metadata[type]", "unlock_helper_view".to_string()),
    ]
}
