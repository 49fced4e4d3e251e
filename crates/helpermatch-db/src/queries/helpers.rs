use anyhow::Result;
use rusqlite::Row;
use uuid::Uuid;

use helpermatch_types::models::{HelperProfile, ModerationStatus};

use super::OptionalExt;
use crate::Database;
use crate::models::{
    ListingFilter, enum_col, list_col, list_text, opt_uuid_col, time_col, timestamp, uuid_col,
};

const HELPER_COLUMNS: &str = "id, user_id, name, age, nationality, experience, years_in_hk, \
     work_experience_type, salary, skills, languages, image_url, availability, description, \
     status, created_at";

impl Database {
    // -- Helper profiles --

    pub fn insert_helper(&self, helper: &HelperProfile) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO helpers ({HELPER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
                ),
                rusqlite::params![
                    helper.id.to_string(),
                    helper.user_id.map(|id| id.to_string()),
                    helper.name,
                    helper.age,
                    helper.nationality,
                    helper.experience,
                    helper.years_in_hk,
                    helper.work_experience_type,
                    helper.salary,
                    list_text(&helper.skills),
                    list_text(&helper.languages),
                    helper.image_url,
                    helper.availability,
                    helper.description,
                    helper.status.as_str(),
                    timestamp(helper.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_helper(&self, id: Uuid) -> Result<Option<HelperProfile>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {HELPER_COLUMNS} FROM helpers WHERE id = ?1"))?;
            stmt.query_row([id.to_string()], map_helper).optional()
        })
    }

    /// Newest first.
    pub fn list_helpers(&self, filter: ListingFilter) -> Result<Vec<HelperProfile>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {HELPER_COLUMNS} FROM helpers
                 WHERE (?1 IS NULL OR user_id = ?1)
                   AND (?2 = 0 OR status = 'approved')
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map(
                    rusqlite::params![filter.owner.map(|id| id.to_string()), filter.approved_only],
                    map_helper,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Existential check: does `user_id` own at least one approved profile.
    pub fn has_approved_helper_profile(&self, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM helpers WHERE user_id = ?1 AND status = 'approved')",
                [user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Overwrites every editable column, including status and owner.
    pub fn update_helper(&self, helper: &HelperProfile) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE helpers
                 SET user_id = ?2, name = ?3, age = ?4, nationality = ?5, experience = ?6,
                     years_in_hk = ?7, work_experience_type = ?8, salary = ?9, skills = ?10,
                     languages = ?11, image_url = ?12, availability = ?13, description = ?14,
                     status = ?15
                 WHERE id = ?1",
                rusqlite::params![
                    helper.id.to_string(),
                    helper.user_id.map(|id| id.to_string()),
                    helper.name,
                    helper.age,
                    helper.nationality,
                    helper.experience,
                    helper.years_in_hk,
                    helper.work_experience_type,
                    helper.salary,
                    list_text(&helper.skills),
                    list_text(&helper.languages),
                    helper.image_url,
                    helper.availability,
                    helper.description,
                    helper.status.as_str(),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_helper_status(&self, id: Uuid, status: ModerationStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE helpers SET status = ?1 WHERE id = ?2",
                rusqlite::params![status.as_str(), id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_helper(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM helpers WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }
}

fn map_helper(row: &Row<'_>) -> rusqlite::Result<HelperProfile> {
    Ok(HelperProfile {
        id: uuid_col(row, 0)?,
        user_id: opt_uuid_col(row, 1)?,
        name: row.get(2)?,
        age: row.get(3)?,
        nationality: row.get(4)?,
        experience: row.get(5)?,
        years_in_hk: row.get(6)?,
        work_experience_type: row.get(7)?,
        salary: row.get(8)?,
        skills: list_col(row, 9)?,
        languages: list_col(row, 10)?,
        image_url: row.get(11)?,
        availability: row.get(12)?,
        description: row.get(13)?,
        status: enum_col(row, 14)?,
        created_at: time_col(row, 15)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;
    use helpermatch_types::models::Role;

    use super::*;
    use crate::queries::testing::user;

    pub fn profile(owner: Option<Uuid>, status: ModerationStatus) -> HelperProfile {
        HelperProfile {
            id: Uuid::new_v4(),
            user_id: owner,
            name: "Maria Santos".into(),
            age: 32,
            nationality: "Filipino".into(),
            experience: "Finished Contract".into(),
            years_in_hk: Some(8),
            work_experience_type: None,
            salary: 4870,
            skills: vec!["Cooking".into(), "Childcare".into()],
            languages: vec!["English".into()],
            image_url: String::new(),
            availability: "Immediate".into(),
            description: "Eight years in Hong Kong.".into(),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn listing_filters_by_status_and_owner() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "Siti", Role::Helper);
        let approved = profile(None, ModerationStatus::Approved);
        let pending = profile(Some(owner), ModerationStatus::Pending);
        db.insert_helper(&approved).unwrap();
        db.insert_helper(&pending).unwrap();

        let public = db
            .list_helpers(ListingFilter { owner: None, approved_only: true })
            .unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, approved.id);

        let mine = db
            .list_helpers(ListingFilter { owner: Some(owner), approved_only: false })
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, pending.id);
        assert_eq!(mine[0].skills, pending.skills);

        let everything = db.list_helpers(ListingFilter::default()).unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn approved_profile_check_is_existential() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "Lwin", Role::Helper);
        db.insert_helper(&profile(Some(owner), ModerationStatus::Rejected)).unwrap();
        let second = profile(Some(owner), ModerationStatus::Pending);
        db.insert_helper(&second).unwrap();
        assert!(!db.has_approved_helper_profile(owner).unwrap());

        assert!(db.set_helper_status(second.id, ModerationStatus::Approved).unwrap());
        assert!(db.has_approved_helper_profile(owner).unwrap());
    }

    #[test]
    fn deleting_owner_keeps_profile_unowned() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "Nok", Role::Helper);
        let helper = profile(Some(owner), ModerationStatus::Approved);
        db.insert_helper(&helper).unwrap();

        assert!(db.delete_user(owner).unwrap());

        let stored = db.get_helper(helper.id).unwrap().unwrap();
        assert_eq!(stored.user_id, None);
    }
}
