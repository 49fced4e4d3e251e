#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt; // for `app.oneshot()`
use uuid::Uuid;

use helpermatch_api::mailer::Mailer;
use helpermatch_api::middleware::create_token;
use helpermatch_api::state::{AppState, AppStateInner};
use helpermatch_db::{Database, NewUser};
use helpermatch_types::models::{ApprovalStatus, AuthProvider, HelperProfile, ModerationStatus, Role};

pub const SECRET: &str = "integration-test-secret";

#[derive(Default)]
pub struct RecordingMailer {
    pub resets: Mutex<Vec<(String, String)>>,
}

impl Mailer for RecordingMailer {
    fn send_welcome(&self, _to: &str, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn send_password_reset(&self, to: &str, token: &str) -> anyhow::Result<()> {
        self.resets.lock().unwrap().push((to.to_string(), token.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let mut inner = AppStateInner::new(Database::open_in_memory().unwrap(), SECRET);
        inner.mailer = mailer.clone() as Arc<dyn Mailer>;
        Self {
            state: Arc::new(inner),
            mailer,
        }
    }

    pub fn router(&self) -> Router {
        helpermatch_api::router(self.state.clone())
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn user(&self, name: &str, role: Role) -> TestUser {
        let id = Uuid::new_v4();
        let email = format!("{}@example.com", name.to_lowercase());
        self.db()
            .create_user(&NewUser {
                id,
                name,
                email: &email,
                password_hash: None,
                role,
                status: ApprovalStatus::Approved,
                auth_provider: AuthProvider::Password,
                created_at: Utc::now(),
            })
            .unwrap();
        let token = create_token(SECRET, id, &email, role).unwrap();
        TestUser { id, token }
    }

    pub fn helper_profile(&self, owner: Option<Uuid>, status: ModerationStatus) -> Uuid {
        let id = Uuid::new_v4();
        self.db()
            .insert_helper(&HelperProfile {
                id,
                user_id: owner,
                name: "Maria Santos".to_string(),
                age: 32,
                nationality: "Filipino".to_string(),
                experience: "Finished Contract".to_string(),
                years_in_hk: Some(5),
                work_experience_type: None,
                salary: 5_200,
                skills: vec!["Cooking".to_string()],
                languages: vec!["English".to_string()],
                image_url: String::new(),
                availability: "Immediate".to_string(),
                description: "Experienced with children".to_string(),
                status,
                created_at: Utc::now(),
            })
            .unwrap();
        id
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }
}
