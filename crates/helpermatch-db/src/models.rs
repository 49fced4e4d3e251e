//! Database row types and column decoding.
//!
//! Users keep a dedicated row type because the table carries credentials and
//! reset-token state that must never reach the wire. Helper profiles, job
//! posts and messages decode straight into their `helpermatch-types` shapes.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use helpermatch_types::models::{
    ApprovalStatus, AuthProvider, PublicUser, Role, UnknownVariant,
};

pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string; `None` for accounts created through Google sign-in.
    pub password: Option<String>,
    pub role: Role,
    pub status: ApprovalStatus,
    pub can_view_helpers: bool,
    pub can_view_jobs: bool,
    pub membership_expires_at: Option<DateTime<Utc>>,
    pub auth_provider: AuthProvider,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for PublicUser {
    fn from(row: UserRow) -> Self {
        PublicUser {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            status: row.status,
            can_view_helpers: row.can_view_helpers,
            can_view_jobs: row.can_view_jobs,
            membership_expires_at: row.membership_expires_at,
            auth_provider: row.auth_provider,
            created_at: row.created_at,
        }
    }
}

pub struct NewUser<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: Option<&'a str>,
    pub role: Role,
    pub status: ApprovalStatus,
    pub auth_provider: AuthProvider,
    pub created_at: DateTime<Utc>,
}

/// Admin edit of a user record. Last writer wins.
pub struct UserUpdate<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub role: Role,
    pub status: ApprovalStatus,
    pub can_view_helpers: bool,
    pub can_view_jobs: bool,
    pub membership_expires_at: Option<DateTime<Utc>>,
}

pub struct ConversationRow {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub last_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRow {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }
}

pub struct NewMessage<'a> {
    pub message_id: Uuid,
    /// Used only if no conversation exists yet for the pair.
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: &'a str,
    pub sent_at: DateTime<Utc>,
}

/// Row selection for helper and job listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub owner: Option<Uuid>,
    pub approved_only: bool,
}

/// Sorted form of an unordered pair, used as the conversation key.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

/// RFC 3339 with fixed microsecond precision, so text order is time order.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// -- Column decoding --

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| t.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        DateTime::parse_from_rfc3339(&t)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

pub(crate) fn enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

/// Lists are stored as JSON arrays of strings.
pub(crate) fn list_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn list_text(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}
