use anyhow::Result;
use rusqlite::{Row, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use helpermatch_types::models::{ConversationSummary, Message, Participant};

use super::OptionalExt;
use crate::Database;
use crate::models::{ConversationRow, NewMessage, canonical_pair, time_col, timestamp, uuid_col};

const CONVERSATION_COLUMNS: &str =
    "id, user1_id, user2_id, last_message, created_at, updated_at";

impl Database {
    // -- Conversations --

    /// Appends a message to the conversation between sender and receiver,
    /// creating the conversation on first contact.
    ///
    /// The lookup-or-insert is one upsert on the canonical `(pair_low,
    /// pair_high)` key inside an IMMEDIATE transaction, so concurrent first
    /// messages for the same pair, from either side and from any connection,
    /// converge on one row. The conversation's `last_message`/`updated_at`
    /// and the new message commit together or not at all.
    ///
    /// Sends are stamped before the lock is taken, so they may commit out of
    /// order. The cached preview only moves forward: a send stamped earlier
    /// than the current `updated_at` adds its message but leaves the preview.
    pub fn send_message(&self, msg: &NewMessage<'_>) -> Result<Message> {
        let (low, high) = canonical_pair(msg.sender_id, msg.receiver_id);
        let sent_at = timestamp(msg.sent_at);
        let candidate_id = msg.conversation_id.to_string();

        let conversation_id = self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            tx.execute(
                "INSERT INTO conversations
                     (id, user1_id, user2_id, pair_low, pair_high, last_message, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT (pair_low, pair_high) DO UPDATE
                     SET last_message = CASE WHEN excluded.updated_at >= updated_at
                                             THEN excluded.last_message ELSE last_message END,
                         updated_at = MAX(updated_at, excluded.updated_at)",
                rusqlite::params![
                    candidate_id,
                    msg.sender_id.to_string(),
                    msg.receiver_id.to_string(),
                    low.to_string(),
                    high.to_string(),
                    msg.content,
                    sent_at,
                ],
            )?;

            let conversation_id: String = tx.query_row(
                "SELECT id FROM conversations WHERE pair_low = ?1 AND pair_high = ?2",
                [low.to_string(), high.to_string()],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, content, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                rusqlite::params![
                    msg.message_id.to_string(),
                    conversation_id,
                    msg.sender_id.to_string(),
                    msg.content,
                    sent_at,
                ],
            )?;

            tx.commit()?;
            Ok(conversation_id)
        })?;

        if conversation_id == candidate_id {
            debug!("Opened conversation {} between {} and {}", conversation_id, msg.sender_id, msg.receiver_id);
        }

        Ok(Message {
            id: msg.message_id,
            conversation_id: conversation_id.parse()?,
            sender_id: msg.sender_id,
            content: msg.content.to_string(),
            is_read: false,
            created_at: msg.sent_at,
        })
    }

    /// Every conversation `user_id` takes part in, most recently active first,
    /// each joined with the other participant's identity.
    pub fn list_conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.last_message, c.updated_at, u.id, u.name, u.email
                 FROM conversations c
                 JOIN users u
                   ON u.id = CASE WHEN c.user1_id = ?1 THEN c.user2_id ELSE c.user1_id END
                 WHERE c.user1_id = ?1 OR c.user2_id = ?1
                 ORDER BY c.updated_at DESC, c.rowid DESC",
            )?;

            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok(ConversationSummary {
                        id: uuid_col(row, 0)?,
                        last_message: row.get(1)?,
                        updated_at: time_col(row, 2)?,
                        other_user: Participant {
                            id: uuid_col(row, 3)?,
                            name: row.get(4)?,
                            email: row.get(5)?,
                        },
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_conversation(&self, id: Uuid) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
            ))?;
            stmt.query_row([id.to_string()], map_conversation).optional()
        })
    }

    /// The conversation for an unordered pair, if one exists.
    pub fn find_conversation(&self, a: Uuid, b: Uuid) -> Result<Option<ConversationRow>> {
        let (low, high) = canonical_pair(a, b);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE pair_low = ?1 AND pair_high = ?2"
            ))?;
            stmt.query_row([low.to_string(), high.to_string()], map_conversation)
                .optional()
        })
    }

    /// Returns the conversation's messages oldest first, as they were before
    /// this call, then marks every message not sent by `reader_id` as read.
    pub fn read_conversation(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<Vec<Message>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let messages = {
                let mut stmt = tx.prepare(
                    "SELECT id, conversation_id, sender_id, content, is_read, created_at
                     FROM messages
                     WHERE conversation_id = ?1
                     ORDER BY created_at ASC, rowid ASC",
                )?;
                stmt.query_map([conversation_id.to_string()], map_message)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };

            let marked = tx.execute(
                "UPDATE messages SET is_read = 1
                 WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0",
                [conversation_id.to_string(), reader_id.to_string()],
            )?;

            tx.commit()?;

            if marked > 0 {
                debug!("Marked {} message(s) read in {} for {}", marked, conversation_id, reader_id);
            }
            Ok(messages)
        })
    }
}

fn map_conversation(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: uuid_col(row, 0)?,
        user1_id: uuid_col(row, 1)?,
        user2_id: uuid_col(row, 2)?,
        last_message: row.get(3)?,
        created_at: time_col(row, 4)?,
        updated_at: time_col(row, 5)?,
    })
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_col(row, 0)?,
        conversation_id: uuid_col(row, 1)?,
        sender_id: uuid_col(row, 2)?,
        content: row.get(3)?,
        is_read: row.get(4)?,
        created_at: time_col(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use chrono::{Duration, Utc};
    use helpermatch_types::models::Role;

    use super::*;
    use crate::queries::testing::user;

    fn send(db: &Database, from: Uuid, to: Uuid, content: &str) -> Message {
        db.send_message(&NewMessage {
            message_id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: from,
            receiver_id: to,
            content,
            sent_at: Utc::now(),
        })
        .unwrap()
    }

    fn conversation_count(db: &Database) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn replies_reuse_the_conversation() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "Alice", Role::Employer);
        let b = user(&db, "Bella", Role::Helper);

        let first = send(&db, a, b, "hi");
        let reply = send(&db, b, a, "hey");

        assert_eq!(first.conversation_id, reply.conversation_id);
        assert_eq!(conversation_count(&db), 1);

        let conversation = db.find_conversation(b, a).unwrap().unwrap();
        assert_eq!(conversation.id, first.conversation_id);
        assert_eq!(conversation.user1_id, a);
        assert_eq!(conversation.last_message, "hey");

        let contents: Vec<String> = db
            .read_conversation(first.conversation_id, a)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["hi", "hey"]);
    }

    #[test]
    fn inbox_orders_by_latest_activity() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "Alice", Role::Employer);
        let b = user(&db, "Bella", Role::Helper);
        let c = user(&db, "Chloe", Role::Helper);

        let now = Utc::now();
        for (to, content, at) in [(b, "to b", now - Duration::seconds(30)), (c, "to c", now - Duration::seconds(20)), (b, "b again", now)] {
            db.send_message(&NewMessage {
                message_id: Uuid::new_v4(),
                conversation_id: Uuid::new_v4(),
                sender_id: a,
                receiver_id: to,
                content,
                sent_at: at,
            })
            .unwrap();
        }

        let inbox = db.list_conversations(a).unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].other_user.id, b);
        assert_eq!(inbox[0].last_message, "b again");
        assert_eq!(inbox[1].other_user.id, c);

        let seen_by_c = db.list_conversations(c).unwrap();
        assert_eq!(seen_by_c.len(), 1);
        assert_eq!(seen_by_c[0].other_user.id, a);
        assert_eq!(seen_by_c[0].other_user.name, "Alice");
    }

    #[test]
    fn late_commit_of_older_send_keeps_newest_preview() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "Alice", Role::Employer);
        let b = user(&db, "Bella", Role::Helper);

        let now = Utc::now();
        for (from, to, content, at) in [(a, b, "newer", now), (b, a, "older", now - Duration::milliseconds(1))] {
            db.send_message(&NewMessage {
                message_id: Uuid::new_v4(),
                conversation_id: Uuid::new_v4(),
                sender_id: from,
                receiver_id: to,
                content,
                sent_at: at,
            })
            .unwrap();
        }

        let conversation = db.find_conversation(a, b).unwrap().unwrap();
        assert_eq!(conversation.last_message, "newer");
        assert_eq!(timestamp(conversation.updated_at), timestamp(now));

        let thread: Vec<String> = db
            .read_conversation(conversation.id, a)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(thread, vec!["older", "newer"]);
        assert_eq!(thread.last().unwrap(), &conversation.last_message);
    }

    #[test]
    fn reading_marks_only_incoming_messages() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "Alice", Role::Employer);
        let b = user(&db, "Bella", Role::Helper);

        let from_a = send(&db, a, b, "are you available?");
        send(&db, b, a, "yes");

        let before = db.read_conversation(from_a.conversation_id, b).unwrap();
        assert!(before.iter().all(|m| !m.is_read));

        let after = db.read_conversation(from_a.conversation_id, b).unwrap();
        let by_sender = |id: Uuid| after.iter().find(|m| m.sender_id == id).unwrap().is_read;
        assert!(by_sender(a));
        assert!(!by_sender(b));
    }

    #[test]
    fn failed_send_leaves_no_conversation() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "Alice", Role::Employer);

        // Unknown receiver trips the foreign key; nothing may be committed.
        let result = db.send_message(&NewMessage {
            message_id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: a,
            receiver_id: Uuid::new_v4(),
            content: "hello?",
            sent_at: Utc::now(),
        });

        assert!(result.is_err());
        assert_eq!(conversation_count(&db), 0);
    }

    #[test]
    fn concurrent_first_contact_converges_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.db");
        let first = Arc::new(Database::open(&path).unwrap());
        let second = Arc::new(Database::open(&path).unwrap());

        let a = user(&first, "Alice", Role::Employer);
        let b = user(&first, "Bella", Role::Helper);

        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = [
            (first.clone(), a, b, "a1"),
            (second.clone(), a, b, "a2"),
            (first.clone(), b, a, "b1"),
            (second.clone(), b, a, "b2"),
        ]
        .into_iter()
        .map(|(db, from, to, content)| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                send(&db, from, to, content).conversation_id
            })
        })
        .collect();

        let ids: Vec<Uuid> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(conversation_count(&first), 1);

        let mut contents: Vec<String> = first
            .read_conversation(ids[0], a)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        contents.sort();
        assert_eq!(contents, vec!["a1", "a2", "b1", "b2"]);
    }
}
