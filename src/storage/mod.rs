//! Cooperative Storage
//! Mission: Persist members and loans in SQLite and aggregate dashboard figures
//!
//! Every operation opens its own connection and drops it before returning, so a
//! connection is released on success, on business-rule failure, and on error alike.

mod loans;
mod members;
mod stats;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode};
use std::time::Duration;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS members (
    member_id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_number TEXT UNIQUE NOT NULL,
    full_name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_members_status ON members(status, created_at DESC);

CREATE TABLE IF NOT EXISTS loans (
    loan_id INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id INTEGER NOT NULL REFERENCES members(member_id),
    principal_amount REAL NOT NULL,
    total_amount REAL NOT NULL,
    amount_paid REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_loans_status ON loans(status, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_loans_member ON loans(member_id, created_at DESC);
"#;

/// Open a connection with the pragmas every store relies on
pub(crate) fn open_connection(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// RFC 3339 UTC timestamp with second precision. Sorts lexicographically.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// True when the error chain holds a SQLite UNIQUE/constraint violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
        )
    })
}

/// Member and loan storage with SQLite backend
pub struct CoopStore {
    db_path: String,
}

impl CoopStore {
    /// Create the store and initialize the schema
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        let conn = store.connect()?;
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize cooperative schema")?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        open_connection(&self.db_path)
    }
}
