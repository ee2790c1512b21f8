//! SQLite-backed missed-word store for single-host deployments

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::error::StoreError;
use crate::missed::{MissedWord, MissedWordStore};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Open (or create) the database and make sure the schema exists
pub fn init_database(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS missed_words (
            word TEXT PRIMARY KEY,
            attempts INTEGER NOT NULL DEFAULT 1,
            correct INTEGER NOT NULL DEFAULT 0,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        init_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|p| p.into_inner());
        f(&conn)
    }

    fn get_missed_words(&self) -> Result<Vec<MissedWord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT word, attempts, correct FROM missed_words ORDER BY updated_at, rowid",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(MissedWord {
                    word: row.get(0)?,
                    attempts: row.get(1)?,
                    correct: row.get(2)?,
                })
            })?;
            let words: Vec<MissedWord> = rows.filter_map(|r| r.ok()).collect();
            Ok(words)
        })
    }

    fn save_miss(&self, word: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO missed_words (word, attempts, correct) VALUES (?1, 1, 0)
                 ON CONFLICT(word) DO UPDATE SET attempts = attempts + 1, updated_at = CURRENT_TIMESTAMP",
                params![word],
            )?;
            Ok(())
        })
    }

    fn delete_word(&self, word: &str) -> Result<usize, StoreError> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM missed_words WHERE word = ?1", params![word])?))
    }
}

impl MissedWordStore for SqliteStore {
    fn load(&self) -> Vec<MissedWord> {
        self.get_missed_words().unwrap_or_else(|e| {
            log::warn!("missed-word db: read failed, using empty list: {e}");
            Vec::new()
        })
    }

    fn add(&self, word: &str) {
        if let Err(e) = self.save_miss(word) {
            log::warn!("missed-word db: failed to add '{word}': {e}");
        }
    }

    fn remove(&self, word: &str) {
        if let Err(e) = self.delete_word(word) {
            log::warn!("missed-word db: failed to remove '{word}': {e}");
        }
    }
}
