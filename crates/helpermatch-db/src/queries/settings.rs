use anyhow::Result;

use super::OptionalExt;
use crate::Database;

impl Database {
    // -- Settings --

    /// All settings as raw `(key, json_text)` pairs, ordered by key.
    pub fn get_settings(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
                .optional()
        })
    }

    pub fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [key, value],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_setting_overwrites() {
        let db = Database::open_in_memory().unwrap();
        db.put_setting("helper_price", "38800").unwrap();
        db.put_setting("helper_price", "42000").unwrap();

        assert_eq!(db.get_setting("helper_price").unwrap().as_deref(), Some("42000"));
        assert_eq!(db.get_settings().unwrap().len(), 1);
        assert!(db.get_setting("missing").unwrap().is_none());
    }
}
