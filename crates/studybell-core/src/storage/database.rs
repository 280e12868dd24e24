//! SQLite-based storage for users, their timetables and exams.
//!
//! Provides persistent storage for:
//! - User accounts (password digests only)
//! - Weekly schedule entries and exams, per user
//! - Key-value store for application state (current session)

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::data_dir;
use crate::error::{CoreError, DatabaseError, ValidationError};
use crate::schedule::{ExamEntry, ExamTag, ScheduleEntry, User, Weekday};

const CURRENT_USER_KEY: &str = "session.current_user";

/// SQLite database for user data.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/studybell.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("studybell.db");
        Ok(Self::open_at(&path)?)
    }

    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                username      TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                created_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS schedules (
                id         TEXT PRIMARY KEY,
                username   TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
                subject    TEXT NOT NULL,
                day        TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS exams (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
                subject     TEXT NOT NULL,
                date        TEXT NOT NULL,
                description TEXT,
                tag         TEXT
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_schedules_username ON schedules(username);
            CREATE INDEX IF NOT EXISTS idx_exams_username ON exams(username);",
        )?;
        Ok(())
    }

    // ── Users ────────────────────────────────────────────────────────

    /// Create an account.
    ///
    /// # Errors
    /// Returns an error if a field is blank, the name is taken, or the
    /// insert fails.
    pub fn register_user(&self, username: &str, password: &str) -> Result<(), CoreError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::EmptyField("username".into()).into());
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".into()).into());
        }
        if self.user_exists(username)? {
            return Err(DatabaseError::UserExists(username.to_string()).into());
        }
        self.conn
            .execute(
                "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
                params![username, password_digest(username, password), Utc::now().to_rfc3339()],
            )
            .map_err(DatabaseError::from)?;
        info!(username, "user registered");
        Ok(())
    }

    /// True if `password` matches. Unknown users simply fail to match.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<bool, DatabaseError> {
        let username = username.trim();
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stored.is_some_and(|hash| hash == password_digest(username, password)))
    }

    pub fn user_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM users WHERE username = ?1",
                params![username],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// A user with all their schedules and exams.
    pub fn load_user(&self, username: &str) -> Result<User, DatabaseError> {
        if !self.user_exists(username)? {
            return Err(DatabaseError::UserNotFound(username.to_string()));
        }
        Ok(User {
            username: username.to_string(),
            schedules: self.list_schedules(username)?,
            exams: self.list_exams(username)?,
        })
    }

    // ── Schedules ────────────────────────────────────────────────────

    pub fn add_schedule(&self, username: &str, entry: &ScheduleEntry) -> Result<(), DatabaseError> {
        insert_schedule(&self.conn, username, entry)
    }

    /// Insert all entries or none.
    pub fn add_schedules(&mut self, username: &str, entries: &[ScheduleEntry]) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction()?;
        for entry in entries {
            insert_schedule(&tx, username, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns true if an entry was deleted.
    pub fn delete_schedule(&self, username: &str, id: &str) -> Result<bool, DatabaseError> {
        let n = self.conn.execute(
            "DELETE FROM schedules WHERE username = ?1 AND id = ?2",
            params![username, id],
        )?;
        Ok(n > 0)
    }

    /// Entries in insertion order.
    pub fn list_schedules(&self, username: &str) -> Result<Vec<ScheduleEntry>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subject, day, start_time, end_time
             FROM schedules WHERE username = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![username], schedule_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            match row {
                Ok(entry) => entries.push(entry),
                // One unreadable row must not hide the rest of the timetable.
                Err(rusqlite::Error::FromSqlConversionFailure(_, _, e)) => {
                    warn!(username, error = %e, "skipping unreadable schedule row");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(entries)
    }

    // ── Exams ────────────────────────────────────────────────────────

    pub fn add_exam(&self, username: &str, exam: &ExamEntry) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO exams (id, username, subject, date, description, tag)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                exam.id,
                username,
                exam.subject,
                exam.date.format("%Y-%m-%d").to_string(),
                exam.description,
                exam.tag.map(ExamTag::label),
            ],
        )?;
        Ok(())
    }

    pub fn delete_exam(&self, username: &str, id: &str) -> Result<bool, DatabaseError> {
        let n = self.conn.execute(
            "DELETE FROM exams WHERE username = ?1 AND id = ?2",
            params![username, id],
        )?;
        Ok(n > 0)
    }

    pub fn list_exams(&self, username: &str) -> Result<Vec<ExamEntry>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subject, date, description, tag
             FROM exams WHERE username = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![username], exam_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Session ──────────────────────────────────────────────────────

    pub fn current_user(&self) -> Result<Option<String>, DatabaseError> {
        Ok(self.kv_get(CURRENT_USER_KEY)?)
    }

    pub fn set_current_user(&self, username: &str) -> Result<(), DatabaseError> {
        Ok(self.kv_set(CURRENT_USER_KEY, username)?)
    }

    pub fn clear_current_user(&self) -> Result<(), DatabaseError> {
        Ok(self.kv_delete(CURRENT_USER_KEY)?)
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn password_digest(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn insert_schedule(conn: &Connection, username: &str, entry: &ScheduleEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO schedules (id, username, subject, day, start_time, end_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.id,
            username,
            entry.subject,
            entry.day.label(),
            entry.start_time,
            entry.end_time,
        ],
    )?;
    Ok(())
}

fn conversion_error(idx: usize, err: ValidationError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduleEntry> {
    let day: String = row.get(2)?;
    Ok(ScheduleEntry {
        id: row.get(0)?,
        subject: row.get(1)?,
        day: day.parse::<Weekday>().map_err(|e| conversion_error(2, e))?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
    })
}

fn exam_from_row(row: &Row<'_>) -> rusqlite::Result<ExamEntry> {
    let date: String = row.get(2)?;
    let tag: Option<String> = row.get(4)?;
    Ok(ExamEntry {
        id: row.get(0)?,
        subject: row.get(1)?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
            conversion_error(
                2,
                ValidationError::InvalidValue {
                    field: "date".into(),
                    message: date.clone(),
                },
            )
        })?,
        description: row.get(3)?,
        tag: tag
            .map(|t| t.parse::<ExamTag>())
            .transpose()
            .map_err(|e| conversion_error(4, e))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::entry;

    fn db_with_user() -> Database {
        let db = Database::open_memory().unwrap();
        db.register_user("lan", "secret").unwrap();
        db
    }

    fn exam(id: &str) -> ExamEntry {
        ExamEntry {
            id: id.into(),
            subject: "Physics".into(),
            date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            description: Some("Room 3".into()),
            tag: Some(ExamTag::Midterm),
        }
    }

    #[test]
    fn register_and_authenticate() {
        let db = db_with_user();
        assert!(db.authenticate("lan", "secret").unwrap());
        assert!(!db.authenticate("lan", "wrong").unwrap());
        assert!(!db.authenticate("nobody", "secret").unwrap());
    }

    #[test]
    fn duplicate_and_blank_registration_rejected() {
        let db = db_with_user();
        assert!(matches!(
            db.register_user("lan", "x"),
            Err(CoreError::Database(DatabaseError::UserExists(_)))
        ));
        assert!(matches!(db.register_user("  ", "x"), Err(CoreError::Validation(_))));
        assert!(matches!(db.register_user("minh", ""), Err(CoreError::Validation(_))));
    }

    #[test]
    fn password_is_not_stored_in_clear() {
        let db = db_with_user();
        let stored: String = db
            .conn()
            .query_row("SELECT password_hash FROM users", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored.len(), 64);
        assert!(!stored.contains("secret"));
    }

    #[test]
    fn unreadable_schedule_row_is_skipped() {
        let db = db_with_user();
        db.add_schedule("lan", &entry("a", "Math", Weekday::Monday, "07:00", "08:00"))
            .unwrap();
        db.conn()
            .execute(
                "INSERT INTO schedules (id, username, subject, day, start_time, end_time)
                 VALUES ('bad', 'lan', 'Chemistry', 'Thứ 9', '09:00', '10:00')",
                [],
            )
            .unwrap();
        db.add_schedule("lan", &entry("c", "Physics", Weekday::Friday, "13:00", "14:00"))
            .unwrap();

        let ids: Vec<String> = db.list_schedules("lan").unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn schedules_roundtrip_in_insertion_order() {
        let mut db = db_with_user();
        db.add_schedule("lan", &entry("b", "Physics", Weekday::Sunday, "09:00", "10:00"))
            .unwrap();
        db.add_schedules(
            "lan",
            &[
                entry("a", "Math", Weekday::Monday, "07:00", "07:45"),
                entry("c", "Chem", Weekday::Friday, "bad", "worse"),
            ],
        )
        .unwrap();
        let ids: Vec<_> = db.list_schedules("lan").unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, ["b", "a", "c"]);
        let first = &db.list_schedules("lan").unwrap()[0];
        assert_eq!(first.day, Weekday::Sunday);
    }

    #[test]
    fn bulk_insert_is_atomic() {
        let mut db = db_with_user();
        let dup = entry("a", "Math", Weekday::Monday, "07:00", "07:45");
        assert!(db.add_schedules("lan", &[dup.clone(), dup]).is_err());
        assert!(db.list_schedules("lan").unwrap().is_empty());
    }

    #[test]
    fn delete_is_scoped_to_user() {
        let db = db_with_user();
        db.register_user("minh", "pw").unwrap();
        db.add_schedule("lan", &entry("a", "Math", Weekday::Monday, "07:00", "07:45"))
            .unwrap();
        assert!(!db.delete_schedule("minh", "a").unwrap());
        assert!(db.delete_schedule("lan", "a").unwrap());
        assert!(!db.delete_schedule("lan", "a").unwrap());
    }

    #[test]
    fn exams_roundtrip() {
        let db = db_with_user();
        db.add_exam("lan", &exam("e1")).unwrap();
        let mut bare = exam("e2");
        bare.description = None;
        bare.tag = None;
        db.add_exam("lan", &bare).unwrap();

        let exams = db.list_exams("lan").unwrap();
        assert_eq!(exams, vec![exam("e1"), bare]);
        assert!(db.delete_exam("lan", "e1").unwrap());
        assert_eq!(db.list_exams("lan").unwrap().len(), 1);
    }

    #[test]
    fn load_user_collects_everything() {
        let db = db_with_user();
        db.add_schedule("lan", &entry("a", "Math", Weekday::Monday, "07:00", "07:45"))
            .unwrap();
        db.add_exam("lan", &exam("e1")).unwrap();
        let user = db.load_user("lan").unwrap();
        assert_eq!(user.schedules.len(), 1);
        assert_eq!(user.exams.len(), 1);
        assert!(matches!(db.load_user("ghost"), Err(DatabaseError::UserNotFound(_))));
    }

    #[test]
    fn session_roundtrip() {
        let db = db_with_user();
        assert!(db.current_user().unwrap().is_none());
        db.set_current_user("lan").unwrap();
        assert_eq!(db.current_user().unwrap().as_deref(), Some("lan"));
        db.clear_current_user().unwrap();
        assert!(db.current_user().unwrap().is_none());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.register_user("lan", "pw").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert!(db.user_exists("lan").unwrap());
    }
}
