use anyhow::Result;
use rusqlite::Row;
use uuid::Uuid;

use helpermatch_types::models::{JobPost, ModerationStatus};

use super::OptionalExt;
use crate::Database;
use crate::models::{
    ListingFilter, enum_col, list_col, list_text, opt_uuid_col, time_col, timestamp, uuid_col,
};

const JOB_COLUMNS: &str =
    "id, user_id, title, location, salary, requirements, description, expiry_date, status, created_at";

impl Database {
    // -- Job posts --

    pub fn insert_job(&self, job: &JobPost) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO jobs ({JOB_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                rusqlite::params![
                    job.id.to_string(),
                    job.user_id.map(|id| id.to_string()),
                    job.title,
                    job.location,
                    job.salary,
                    list_text(&job.requirements),
                    job.description,
                    job.expiry_date,
                    job.status.as_str(),
                    timestamp(job.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_job(&self, id: Uuid) -> Result<Option<JobPost>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"))?;
            stmt.query_row([id.to_string()], map_job).optional()
        })
    }

    /// Newest first.
    pub fn list_jobs(&self, filter: ListingFilter) -> Result<Vec<JobPost>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM jobs
                 WHERE (?1 IS NULL OR user_id = ?1)
                   AND (?2 = 0 OR status = 'approved')
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map(
                    rusqlite::params![filter.owner.map(|id| id.to_string()), filter.approved_only],
                    map_job,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_job(&self, job: &JobPost) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE jobs
                 SET user_id = ?2, title = ?3, location = ?4, salary = ?5, requirements = ?6,
                     description = ?7, expiry_date = ?8, status = ?9
                 WHERE id = ?1",
                rusqlite::params![
                    job.id.to_string(),
                    job.user_id.map(|id| id.to_string()),
                    job.title,
                    job.location,
                    job.salary,
                    list_text(&job.requirements),
                    job.description,
                    job.expiry_date,
                    job.status.as_str(),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_job_status(&self, id: Uuid, status: ModerationStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE jobs SET status = ?1 WHERE id = ?2",
                rusqlite::params![status.as_str(), id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_job(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM jobs WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }
}

fn map_job(row: &Row<'_>) -> rusqlite::Result<JobPost> {
    Ok(JobPost {
        id: uuid_col(row, 0)?,
        user_id: opt_uuid_col(row, 1)?,
        title: row.get(2)?,
        location: row.get(3)?,
        salary: row.get(4)?,
        requirements: list_col(row, 5)?,
        description: row.get(6)?,
        expiry_date: row.get(7)?,
        status: enum_col(row, 8)?,
        created_at: time_col(row, 9)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn job(title: &str, status: ModerationStatus, age_minutes: i64) -> JobPost {
        JobPost {
            id: Uuid::new_v4(),
            user_id: None,
            title: title.into(),
            location: "Sha Tin".into(),
            salary: "HK$4,990".into(),
            requirements: vec!["Cooking".into()],
            description: "Family of four.".into(),
            expiry_date: None,
            status,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn listing_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.insert_job(&job("older", ModerationStatus::Approved, 10)).unwrap();
        db.insert_job(&job("newer", ModerationStatus::Approved, 1)).unwrap();
        db.insert_job(&job("hidden", ModerationStatus::Rejected, 0)).unwrap();

        let titles: Vec<String> = db
            .list_jobs(ListingFilter { owner: None, approved_only: true })
            .unwrap()
            .into_iter()
            .map(|j| j.title)
            .collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[test]
    fn update_missing_job_reports_false() {
        let db = Database::open_in_memory().unwrap();
        let ghost = job("ghost", ModerationStatus::Pending, 0);
        assert!(!db.update_job(&ghost).unwrap());
        assert!(!db.set_job_status(ghost.id, ModerationStatus::Approved).unwrap());
        assert!(!db.delete_job(ghost.id).unwrap());
    }
}
