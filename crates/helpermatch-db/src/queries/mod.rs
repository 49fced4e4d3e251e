mod conversations;
mod helpers;
mod jobs;
mod settings;
mod users;

use anyhow::Result;

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::Utc;
    use helpermatch_types::models::{ApprovalStatus, AuthProvider, Role};
    use uuid::Uuid;

    use crate::{Database, NewUser};

    pub fn user(db: &Database, name: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        let email = format!("{}@example.com", name.to_lowercase());
        db.create_user(&NewUser {
            id,
            name,
            email: &email,
            password_hash: Some("hash"),
            role,
            status: ApprovalStatus::Approved,
            auth_provider: AuthProvider::Password,
            created_at: Utc::now(),
        })
        .unwrap();
        id
    }
}
