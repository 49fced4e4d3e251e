use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                      TEXT PRIMARY KEY,
                name                    TEXT NOT NULL,
                email                   TEXT NOT NULL UNIQUE,
                password                TEXT,
                role                    TEXT NOT NULL CHECK (role IN ('employer', 'helper', 'admin')),
                status                  TEXT NOT NULL DEFAULT 'approved'
                                            CHECK (status IN ('pending', 'approved')),
                can_view_helpers        INTEGER NOT NULL DEFAULT 0,
                can_view_jobs           INTEGER NOT NULL DEFAULT 0,
                membership_expires_at   TEXT,
                auth_provider           TEXT NOT NULL DEFAULT 'password',
                reset_token_hash        TEXT,
                reset_token_expires_at  TEXT,
                created_at              TEXT NOT NULL
            );

            CREATE TABLE helpers (
                id                      TEXT PRIMARY KEY,
                user_id                 TEXT REFERENCES users(id) ON DELETE SET NULL,
                name                    TEXT NOT NULL,
                age                     INTEGER NOT NULL,
                nationality             TEXT NOT NULL,
                experience              TEXT NOT NULL,
                years_in_hk             INTEGER,
                work_experience_type    TEXT,
                salary                  INTEGER NOT NULL,
                skills                  TEXT NOT NULL DEFAULT '[]',
                languages               TEXT NOT NULL DEFAULT '[]',
                image_url               TEXT NOT NULL DEFAULT '',
                availability            TEXT NOT NULL,
                description             TEXT NOT NULL,
                status                  TEXT NOT NULL DEFAULT 'pending'
                                            CHECK (status IN ('pending', 'approved', 'rejected')),
                created_at              TEXT NOT NULL
            );

            CREATE INDEX idx_helpers_owner ON helpers(user_id, status);
            CREATE INDEX idx_helpers_status ON helpers(status, created_at);

            CREATE TABLE jobs (
                id              TEXT PRIMARY KEY,
                user_id         TEXT REFERENCES users(id) ON DELETE SET NULL,
                title           TEXT NOT NULL,
                location        TEXT NOT NULL,
                salary          TEXT NOT NULL,
                requirements    TEXT NOT NULL DEFAULT '[]',
                description     TEXT NOT NULL,
                expiry_date     TEXT,
                status          TEXT NOT NULL DEFAULT 'pending'
                                    CHECK (status IN ('pending', 'approved', 'rejected')),
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_jobs_owner ON jobs(user_id, status);
            CREATE INDEX idx_jobs_status ON jobs(status, created_at);

            -- user1/user2 keep initiator order; pair_low/pair_high hold the
            -- same ids sorted, and carry the one-conversation-per-pair rule.
            CREATE TABLE conversations (
                id              TEXT PRIMARY KEY,
                user1_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                user2_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                pair_low        TEXT NOT NULL,
                pair_high       TEXT NOT NULL,
                last_message    TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                CHECK (pair_low <= pair_high),
                UNIQUE (pair_low, pair_high)
            );

            CREATE INDEX idx_conversations_user1 ON conversations(user1_id, updated_at);
            CREATE INDEX idx_conversations_user2 ON conversations(user2_id, updated_at);

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                sender_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content         TEXT NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation ON messages(conversation_id, created_at);

            CREATE TABLE settings (
                key     TEXT PRIMARY KEY,
                value   TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
