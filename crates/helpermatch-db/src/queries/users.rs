use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::OptionalExt;
use crate::Database;
use crate::models::{
    NewUser, UserRow, UserUpdate, enum_col, opt_time_col, time_col, timestamp, uuid_col,
};

const USER_COLUMNS: &str = "id, name, email, password, role, status, can_view_helpers, \
     can_view_jobs, membership_expires_at, auth_provider, reset_token_expires_at, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, role, status, auth_provider, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    user.role.as_str(),
                    user.status.as_str(),
                    user.auth_provider.as_str(),
                    timestamp(user.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    /// Lookup by the SHA-256 hex digest of a password reset token.
    pub fn get_user_by_reset_token(&self, token_hash: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "reset_token_hash", token_hash))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false if no such user exists.
    pub fn update_user(&self, id: Uuid, update: &UserUpdate<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET name = ?1, email = ?2, role = ?3, status = ?4,
                     can_view_helpers = ?5, can_view_jobs = ?6, membership_expires_at = ?7
                 WHERE id = ?8",
                rusqlite::params![
                    update.name,
                    update.email,
                    update.role.as_str(),
                    update.status.as_str(),
                    update.can_view_helpers,
                    update.can_view_jobs,
                    update.membership_expires_at.map(timestamp),
                    id.to_string(),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    /// Sets both capability flags after a successful payment. Returns false
    /// if no such user exists.
    pub fn grant_premium(&self, id: Uuid, expires_at: Option<DateTime<Utc>>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET can_view_helpers = 1, can_view_jobs = 1,
                     membership_expires_at = COALESCE(?1, membership_expires_at)
                 WHERE id = ?2",
                rusqlite::params![expires_at.map(timestamp), id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET reset_token_hash = ?1, reset_token_expires_at = ?2 WHERE id = ?3",
                rusqlite::params![token_hash, timestamp(expires_at), id.to_string()],
            )?;
            Ok(())
        })
    }

    /// Replaces the password hash and clears any outstanding reset token.
    pub fn set_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET password = ?1, reset_token_hash = NULL, reset_token_expires_at = NULL
                 WHERE id = ?2",
                rusqlite::params![password_hash, id.to_string()],
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
    ))?;

    stmt.query_row([value], map_user).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: enum_col(row, 4)?,
        status: enum_col(row, 5)?,
        can_view_helpers: row.get(6)?,
        can_view_jobs: row.get(7)?,
        membership_expires_at: opt_time_col(row, 8)?,
        auth_provider: enum_col(row, 9)?,
        reset_token_expires_at: opt_time_col(row, 10)?,
        created_at: time_col(row, 11)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use helpermatch_types::models::{ApprovalStatus, Role};

    use super::*;
    use crate::is_unique_violation;
    use crate::queries::testing::user;

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        let id = user(&db, "Amy", Role::Employer);
        let existing = db.get_user_by_id(id).unwrap().unwrap();

        let err = db
            .create_user(&NewUser {
                id: Uuid::new_v4(),
                name: "Other Amy",
                email: &existing.email,
                password_hash: None,
                role: Role::Helper,
                status: ApprovalStatus::Approved,
                auth_provider: helpermatch_types::models::AuthProvider::Google,
                created_at: Utc::now(),
            })
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn grant_premium_sets_both_flags() {
        let db = Database::open_in_memory().unwrap();
        let id = user(&db, "Ben", Role::Employer);
        let expiry = Utc::now() + Duration::days(30);

        assert!(db.grant_premium(id, Some(expiry)).unwrap());

        let row = db.get_user_by_id(id).unwrap().unwrap();
        assert!(row.can_view_helpers);
        assert!(row.can_view_jobs);
        assert_eq!(row.membership_expires_at.map(timestamp), Some(timestamp(expiry)));
    }

    #[test]
    fn grant_premium_on_missing_user_reports_false() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.grant_premium(Uuid::new_v4(), None).unwrap());
    }

    #[test]
    fn set_password_clears_reset_token() {
        let db = Database::open_in_memory().unwrap();
        let id = user(&db, "Cat", Role::Helper);
        db.set_reset_token(id, "digest", Utc::now() + Duration::hours(1)).unwrap();
        assert!(db.get_user_by_reset_token("digest").unwrap().is_some());

        db.set_password(id, "new-hash").unwrap();

        assert!(db.get_user_by_reset_token("digest").unwrap().is_none());
        let row = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(row.password.as_deref(), Some("new-hash"));
        assert!(row.reset_token_expires_at.is_none());
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        let update = UserUpdate {
            name: "Ghost",
            email: "ghost@example.com",
            role: Role::Helper,
            status: ApprovalStatus::Approved,
            can_view_helpers: false,
            can_view_jobs: true,
            membership_expires_at: None,
        };
        assert!(!db.update_user(Uuid::new_v4(), &update).unwrap());
        assert!(!db.delete_user(Uuid::new_v4()).unwrap());
    }
}
