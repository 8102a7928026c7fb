//! User Storage
//! Mission: Store cooperative user accounts and check credentials with SQLite

use crate::auth::models::{AccountStatus, User, UserRole};
use crate::storage::{open_connection, timestamp};
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Row};
use tracing::{info, warn};

const USER_COLUMNS: &str =
    "id, staff_no, email, password_hash, full_name, role, status, created_at, last_login";

/// Fields needed to create an account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: UserRole,
    pub staff_no: Option<String>,
}

/// User storage with SQLite backend.
///
/// A connection is opened per operation and dropped when it returns, on every path.
pub struct UserStore {
    db_path: String,
}

impl UserStore {
    /// Create a new user store and initialize the schema
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        open_connection(&self.db_path)
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                staff_no TEXT UNIQUE,
                email TEXT UNIQUE NOT NULL COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                full_name TEXT NOT NULL,
                role TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                last_login TEXT
            )",
            [],
        )
        .context("Failed to create users table")?;

        Ok(())
    }

    /// Create an admin account if the store has none yet. Returns whether one was created.
    pub fn ensure_admin(&self, email: &str, password: &str) -> Result<bool> {
        let conn = self.connect()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'admin'",
                [],
                |row| row.get(0),
            )
            .context("Failed to check for admin users")?;

        if count > 0 {
            return Ok(false);
        }

        let admin = self.create_user(&NewUser {
            email: email.to_string(),
            password: password.to_string(),
            full_name: "Administrator".to_string(),
            role: UserRole::Admin,
            staff_no: None,
        })?;

        info!("🔐 Bootstrap admin user created: {}", admin.email);
        warn!("⚠️  Rotate the bootstrap admin password after first login");
        Ok(true)
    }

    /// Look up a user by email (case-insensitive) or staff number
    pub fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let identifier = identifier.trim();
        let conn = self.connect()?;

        let sql = format!(
            "SELECT {} FROM users WHERE email = ?1 COLLATE NOCASE OR staff_no = ?1 LIMIT 1",
            USER_COLUMNS
        );
        conn.query_row(&sql, params![identifier], row_to_user)
            .optional()
            .context("Failed to look up user")
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.connect()?;
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        conn.query_row(&sql, params![id], row_to_user)
            .optional()
            .context("Failed to load user")
    }

    /// Check an identifier/password pair. `Ok(None)` for an unknown user or a wrong password.
    pub fn verify_credentials(&self, identifier: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.find_by_identifier(identifier)? else {
            return Ok(None);
        };

        let valid = verify(password, &user.password_hash).context("Failed to verify password")?;
        Ok(valid.then_some(user))
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        let conn = self.connect()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1 COLLATE NOCASE",
                params![email.trim()],
                |row| row.get(0),
            )
            .context("Failed to check email")?;
        Ok(count > 0)
    }

    /// Create a new active user with a bcrypt-hashed password
    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let password_hash =
            hash(&new_user.password, DEFAULT_COST).context("Failed to hash password")?;
        let email = new_user.email.trim().to_lowercase();
        let staff_no = new_user
            .staff_no
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let created_at = timestamp(Utc::now());

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO users (staff_no, email, password_hash, full_name, role, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                staff_no,
                email,
                password_hash,
                new_user.full_name.trim(),
                new_user.role.as_str(),
                AccountStatus::Active.as_str(),
                created_at,
            ],
        )
        .context("Failed to insert user")?;

        let user = User {
            id: conn.last_insert_rowid(),
            staff_no,
            email,
            password_hash,
            full_name: new_user.full_name.trim().to_string(),
            role: new_user.role,
            status: AccountStatus::Active,
            created_at,
            last_login: None,
        };

        info!("✅ Created user: {} ({})", user.email, user.role.as_str());

        Ok(user)
    }

    /// Activate or deactivate an account. Returns false when no user has `id`.
    pub fn set_status(&self, id: i64, status: AccountStatus) -> Result<bool> {
        let conn = self.connect()?;
        let rows = conn
            .execute(
                "UPDATE users SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )
            .context("Failed to update user status")?;
        Ok(rows > 0)
    }

    /// Stamp `last_login` with the current time
    pub fn record_login(&self, id: i64) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![timestamp(Utc::now()), id],
        )
        .context("Failed to record login")?;
        Ok(())
    }

    /// Page through users, newest first, optionally filtered by role.
    /// Returns the page and the total number of matching users.
    pub fn list_users(
        &self,
        role: Option<UserRole>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64)> {
        let conn = self.connect()?;

        let mut filter = String::new();
        let mut args: Vec<Value> = Vec::new();
        if let Some(role) = role {
            filter.push_str(" WHERE role = ?");
            args.push(Value::Text(role.as_str().to_string()));
        }

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM users{}", filter),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )
            .context("Failed to count users")?;

        let sql = format!(
            "SELECT {} FROM users{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS, filter
        );
        args.push(Value::Integer(limit));
        args.push(Value::Integer(offset));

        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_from_iter(args.iter()), row_to_user)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list users")?;

        Ok((users, total))
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(5)?;
    let status: String = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        staff_no: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        full_name: row.get(4)?,
        role: UserRole::from_str(&role).unwrap_or(UserRole::Member),
        status: AccountStatus::from_str(&status).unwrap_or(AccountStatus::Inactive),
        created_at: row.get(7)?,
        last_login: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::is_unique_violation;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (UserStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = UserStore::new(db_path).unwrap();
        (store, temp_file)
    }

    fn new_user(email: &str, role: UserRole) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "password123".to_string(),
            full_name: "Test User".to_string(),
            role,
            staff_no: None,
        }
    }

    #[test]
    fn test_ensure_admin_only_once() {
        let (store, _temp) = create_test_store();

        assert!(store.ensure_admin("admin@coop.test", "admin-pass").unwrap());
        assert!(!store.ensure_admin("other@coop.test", "admin-pass").unwrap());

        let admin = store.find_by_identifier("admin@coop.test").unwrap().unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert!(store.find_by_identifier("other@coop.test").unwrap().is_none());
    }

    #[test]
    fn test_credential_verification() {
        let (store, _temp) = create_test_store();
        store
            .create_user(&new_user("member@coop.test", UserRole::Member))
            .unwrap();

        let user = store
            .verify_credentials("member@coop.test", "password123")
            .unwrap();
        assert!(user.is_some());

        assert!(store
            .verify_credentials("member@coop.test", "wrong")
            .unwrap()
            .is_none());
        assert!(store
            .verify_credentials("nobody@coop.test", "password123")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_lookup_by_staff_number_and_case_insensitive_email() {
        let (store, _temp) = create_test_store();
        let mut officer = new_user("Officer@Coop.test", UserRole::LoanOfficer);
        officer.staff_no = Some(" ST-100 ".to_string());
        let created = store.create_user(&officer).unwrap();

        assert_eq!(created.email, "officer@coop.test");
        assert_eq!(created.staff_no.as_deref(), Some("ST-100"));

        let by_staff = store.find_by_identifier("ST-100").unwrap().unwrap();
        assert_eq!(by_staff.id, created.id);

        let by_email = store.find_by_identifier("OFFICER@coop.test").unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert!(store.email_exists("officer@COOP.test").unwrap());
    }

    #[test]
    fn test_duplicate_email_is_unique_violation() {
        let (store, _temp) = create_test_store();
        store
            .create_user(&new_user("dup@coop.test", UserRole::Member))
            .unwrap();

        let err = store
            .create_user(&new_user("DUP@coop.test", UserRole::Member))
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn test_status_and_last_login() {
        let (store, _temp) = create_test_store();
        let user = store
            .create_user(&new_user("m@coop.test", UserRole::Member))
            .unwrap();
        assert!(user.last_login.is_none());

        store.record_login(user.id).unwrap();
        assert!(store.set_status(user.id, AccountStatus::Inactive).unwrap());

        let reloaded = store.get_user(user.id).unwrap().unwrap();
        assert!(reloaded.last_login.is_some());
        assert_eq!(reloaded.status, AccountStatus::Inactive);

        assert!(!store.set_status(9999, AccountStatus::Active).unwrap());
    }

    #[test]
    fn test_list_users_with_filter_and_pagination() {
        let (store, _temp) = create_test_store();
        for i in 0..3 {
            store
                .create_user(&new_user(&format!("m{}@coop.test", i), UserRole::Member))
                .unwrap();
        }
        store
            .create_user(&new_user("lo@coop.test", UserRole::LoanOfficer))
            .unwrap();

        let (all, total) = store.list_users(None, 100, 0).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(total, 4);
        // Newest first
        assert_eq!(all[0].email, "lo@coop.test");

        let (members, total) = store.list_users(Some(UserRole::Member), 2, 0).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(total, 3);

        let (rest, _) = store.list_users(Some(UserRole::Member), 2, 2).unwrap();
        assert_eq!(rest.len(), 1);
        assert!(rest.iter().all(|u| u.role == UserRole::Member));
    }
}
