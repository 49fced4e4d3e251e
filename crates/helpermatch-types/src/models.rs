use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted string is not one of an enum's variants.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employer,
    Helper,
    Admin,
}

string_enum!(Role, "role", {
    Employer => "employer",
    Helper => "helper",
    Admin => "admin",
});

/// Account approval. Registration currently approves immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
}

string_enum!(ApprovalStatus, "approval status", {
    Pending => "pending",
    Approved => "approved",
});

/// Moderation lifecycle of helper profiles and job posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

string_enum!(ModerationStatus, "moderation status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Password,
    Google,
}

string_enum!(AuthProvider, "auth provider", {
    Password => "password",
    Google => "google",
});

/// The two gated collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Helpers,
    Jobs,
}

/// A user as exposed over the API. Never carries credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: ApprovalStatus,
    pub can_view_helpers: bool,
    pub can_view_jobs: bool,
    pub membership_expires_at: Option<DateTime<Utc>>,
    pub auth_provider: AuthProvider,
    pub created_at: DateTime<Utc>,
}

/// Identity fields shown for the other side of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelperProfile {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub age: u32,
    pub nationality: String,
    pub experience: String,
    pub years_in_hk: Option<u32>,
    pub work_experience_type: Option<String>,
    pub salary: u32,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub image_url: String,
    pub availability: String,
    pub description: String,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPost {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub location: String,
    pub salary: String,
    pub requirements: Vec<String>,
    pub description: String,
    pub expiry_date: Option<String>,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// One inbox row: the conversation seen from one participant's side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_user: Participant,
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
}
