// SqliteStore: rusqlite backend implementing the ViolationStore trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The mutex also serializes appends.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use super::{ViolationRecord, ViolationStore};

pub struct SqliteStore {
    conn: Mutex<Connection>,
    location: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and create the table.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory for database: {}", path.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::with_connection(conn, path.display().to_string())
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn, ":memory:".to_string())
    }

    fn with_connection(conn: Connection, location: String) -> Result<Self> {
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }
}

/// Idempotent: safe to call on every startup.
fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS violations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,           -- RFC 3339, UTC
            user_id TEXT NOT NULL,
            text_preview TEXT NOT NULL,
            category TEXT NOT NULL,            -- safe / spam / inappropriate / violence / hate_speech
            risk_score REAL NOT NULL,          -- 0.0 to 1.0
            matched_terms TEXT NOT NULL        -- JSON array of matched tokens
        );

        CREATE INDEX IF NOT EXISTS idx_violations_timestamp
            ON violations(timestamp);
        ",
    )
    .context("Failed to create violation table")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: which signal kinds fired. Rows from v1 were text-only.
    run_migration(conn, 2, |c| {
        c.execute_batch(
            "ALTER TABLE violations ADD COLUMN text_flagged INTEGER NOT NULL DEFAULT 1;
             ALTER TABLE violations ADD COLUMN image_flagged INTEGER NOT NULL DEFAULT 0;",
        )
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

#[async_trait]
impl ViolationStore for SqliteStore {
    async fn append(&self, record: &ViolationRecord) -> Result<()> {
        let matched = serde_json::to_string(&record.matched_terms)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO violations
                (timestamp, user_id, text_preview, category, risk_score, matched_terms,
                 text_flagged, image_flagged)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.timestamp.to_rfc3339(),
                record.user_id,
                record.text_preview,
                record.category.as_str(),
                record.risk_score,
                matched,
                record.text_flagged,
                record.image_flagged,
            ],
        )
        .context("Failed to insert violation")?;
        Ok(())
    }

    async fn history(&self) -> Result<Vec<ViolationRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT timestamp, user_id, text_preview, category, risk_score, matched_terms,
                    text_flagged, image_flagged
             FROM violations ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, bool>(6)?,
                row.get::<_, bool>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (
                timestamp,
                user_id,
                text_preview,
                category,
                risk_score,
                matched,
                text_flagged,
                image_flagged,
            ) = row?;
            records.push(ViolationRecord {
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .with_context(|| format!("Bad timestamp in violations table: {timestamp}"))?
                    .with_timezone(&Utc),
                user_id,
                text_preview,
                category: category.parse()?,
                risk_score,
                matched_terms: serde_json::from_str(&matched)
                    .context("Bad matched_terms JSON in violations table")?,
                text_flagged,
                image_flagged,
            });
        }
        Ok(records)
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::Category;
    use chrono::Duration;

    fn record(user: &str, hours_ago: i64) -> ViolationRecord {
        ViolationRecord {
            timestamp: Utc::now() - Duration::hours(hours_ago),
            user_id: user.to_string(),
            text_preview: "kill it".to_string(),
            category: Category::HateSpeech,
            risk_score: 1.0,
            matched_terms: vec!["kill".to_string()],
            text_flagged: true,
            image_flagged: hours_ago == 0,
        }
    }

    #[tokio::test]
    async fn test_empty_table_counts_zero() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.total_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history_round_trips_records() {
        let store = SqliteStore::in_memory().unwrap();
        store.append(&record("a", 0)).await.unwrap();
        store.append(&record("b", 48)).await.unwrap();

        let history = store.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].user_id, "a");
        assert_eq!(history[0].category, Category::HateSpeech);
        assert_eq!(history[0].matched_terms, vec!["kill".to_string()]);
        assert_eq!(store.count_since(Duration::hours(24)).await.unwrap(), 1);
        assert!(history[0].image_flagged);
        assert!(!history[1].image_flagged);
    }

    #[tokio::test]
    async fn test_v1_database_is_migrated() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE violations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                user_id TEXT NOT NULL,
                text_preview TEXT NOT NULL,
                category TEXT NOT NULL,
                risk_score REAL NOT NULL,
                matched_terms TEXT NOT NULL
            );
            INSERT INTO violations (timestamp, user_id, text_preview, category, risk_score, matched_terms)
            VALUES ('2026-01-01T00:00:00+00:00', 'old', 'kill', 'violence', 0.6, '[\"kill\"]');",
        )
        .unwrap();

        let store = SqliteStore::with_connection(conn, ":memory:".to_string()).unwrap();
        store.append(&record("new", 0)).await.unwrap();

        let history = store.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].text_flagged);
        assert!(!history[0].image_flagged);

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.text_violations, 2);
        assert_eq!(stats.image_violations, 1);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("violations.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.append(&record("a", 0)).await.unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.total_count().await.unwrap(), 1);
    }
}
