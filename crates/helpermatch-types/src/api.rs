use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    ApprovalStatus, HelperProfile, ModerationStatus, PublicUser, Role,
};

// -- JWT Claims --

/// Bearer token claims. `role` is informational only; authorization always
/// re-reads the user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by register, login and Google sign-in.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleSignInRequest {
    pub credential: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageOnly {
    pub message: String,
}

// -- Access --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    Admin,
    /// Helpers browsing helpers, employers browsing jobs.
    OwnCategory,
    CapabilityFlag,
    ApprovedProfile,
    Unauthenticated,
    MissingCapability,
    NoApprovedProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessSummary {
    pub helpers: AccessDecision,
    pub jobs: AccessDecision,
}

// -- Listings --

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub owner: Option<Uuid>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct HelperInput {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub age: u32,
    pub nationality: String,
    pub experience: String,
    pub years_in_hk: Option<u32>,
    pub work_experience_type: Option<String>,
    pub salary: u32,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub image_url: String,
    pub availability: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct JobInput {
    pub user_id: Option<Uuid>,
    pub title: String,
    pub location: String,
    pub salary: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub description: String,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub status: ModerationStatus,
}

// -- Users (admin) --

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub can_view_helpers: bool,
    #[serde(default)]
    pub can_view_jobs: bool,
    pub membership_expires_at: Option<DateTime<Utc>>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
}

// -- Payments --

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub user: PublicUser,
}

// -- AI --

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub query: String,
}

/// Structured criteria extracted by the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCriteria {
    pub nationality: String,
    pub experience: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResponse {
    pub criteria: MatchCriteria,
    pub matches: Vec<HelperProfile>,
}

#[derive(Debug, Deserialize)]
pub struct JobDescriptionRequest {
    pub details: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobDescriptionResponse {
    pub description: String,
}

// -- Settings --

pub type SettingsMap = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Deserialize)]
pub struct PutSettingRequest {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
