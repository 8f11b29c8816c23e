//! SQLite-based account storage.
//!
//! This module provides `AccountStore`, a single-table store of usernames and
//! SHA-256 password digests. Plaintext passwords never reach the database or
//! the logs.

use parking_lot::Mutex;
use rusqlite::{ffi, params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::{AccountError, AccountResult};
use crate::password::{hash_password, verify_password};

/// SQLite-based account storage.
///
/// The connection sits behind a mutex so the store can be shared across
/// threads; callers on an async runtime should use `spawn_blocking`.
pub struct AccountStore {
    conn: Mutex<Connection>,
}

impl AccountStore {
    /// Open (or create) the account database at the given path.
    ///
    /// Creates the `users` table if it doesn't exist.
    ///
    /// # Errors
    /// Returns `AccountError::Storage` if the database cannot be opened or
    /// the schema cannot be created.
    pub fn new<P: AsRef<Path>>(path: P) -> AccountResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> AccountResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> AccountResult<()> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Create an account.
    ///
    /// # Errors
    /// - `AccountError::DuplicateUsername` if the username is taken (nothing is written).
    /// - `AccountError::Storage` on any other database failure.
    pub fn create_account(&self, username: &str, password: &str) -> AccountResult<()> {
        let hashed = hash_password(password);

        let result = self.conn.lock().execute(
            "INSERT INTO users (username, password) VALUES (?1, ?2)",
            params![username, hashed],
        );

        match result {
            Ok(_) => {
                tracing::info!("Account created for username: {}", username);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                tracing::warn!("Username already exists: {}", username);
                Err(AccountError::DuplicateUsername(username.to_string()))
            }
            Err(e) => {
                tracing::error!("Database error creating account: {}", e);
                Err(e.into())
            }
        }
    }

    /// Check a username/password pair.
    ///
    /// Returns `false` both for an unknown username and for a wrong password.
    ///
    /// # Errors
    /// Returns `AccountError::Storage` only on database failure.
    pub fn authenticate(&self, username: &str, password: &str) -> AccountResult<bool> {
        let stored = self.password_hash(username)?;

        let ok = stored
            .as_deref()
            .is_some_and(|hash| verify_password(password, hash));

        if ok {
            tracing::info!("Login successful for username: {}", username);
        } else {
            tracing::warn!("Invalid username or password for username: {}", username);
        }
        Ok(ok)
    }

    /// Replace the password after checking the current one.
    ///
    /// # Errors
    /// - `AccountError::InvalidCredentials` if the user doesn't exist or
    ///   `old_password` is wrong.
    /// - `AccountError::Storage` on database failure.
    pub fn update_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> AccountResult<()> {
        let conn = self.conn.lock();

        let stored: Option<String> = conn
            .query_row(
                "SELECT password FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| {
                tracing::error!("Database error reading account: {}", e);
                AccountError::from(e)
            })?;

        match stored {
            Some(hash) if verify_password(old_password, &hash) => {}
            _ => {
                tracing::warn!("Invalid old password for username: {}", username);
                return Err(AccountError::InvalidCredentials);
            }
        }

        conn.execute(
            "UPDATE users SET password = ?1 WHERE username = ?2",
            params![hash_password(new_password), username],
        )
        .map_err(|e| {
            tracing::error!("Database error updating password: {}", e);
            AccountError::from(e)
        })?;

        tracing::info!("Password updated for username: {}", username);
        Ok(())
    }

    /// Stored digest for a username.
    ///
    /// # Errors
    /// Returns `AccountError::Storage` on database failure.
    pub fn password_hash(&self, username: &str) -> AccountResult<Option<String>> {
        self.conn
            .lock()
            .query_row(
                "SELECT password FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| {
                tracing::error!("Database error reading account: {}", e);
                e.into()
            })
    }

    /// Check if a username is registered.
    ///
    /// # Errors
    /// Returns `AccountError::Storage` on database failure.
    pub fn exists(&self, username: &str) -> AccountResult<bool> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Number of accounts.
    ///
    /// # Errors
    /// Returns `AccountError::Storage` on database failure.
    pub fn count(&self) -> AccountResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn create_test_store() -> AccountStore {
        AccountStore::in_memory().expect("Failed to create in-memory store")
    }

    #[test]
    fn test_create_stores_digest_not_plaintext() {
        let store = create_test_store();

        store.create_account("testuser", "password123").unwrap();

        let stored = store.password_hash("testuser").unwrap().unwrap();
        assert_eq!(stored, hash_password("password123"));
        assert_ne!(stored, "password123");
        assert!(store.exists("testuser").unwrap());
    }

    #[test]
    fn test_duplicate_username_leaves_row_unchanged() {
        let store = create_test_store();

        store.create_account("testuser", "first").unwrap();
        let result = store.create_account("testuser", "second");

        assert!(matches!(result, Err(AccountError::DuplicateUsername(ref u)) if u == "testuser"));
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(
            store.password_hash("testuser").unwrap(),
            Some(hash_password("first"))
        );
    }

    #[test]
    fn test_authenticate() {
        let store = create_test_store();
        store.create_account("testuser", "password123").unwrap();

        assert!(store.authenticate("testuser", "password123").unwrap());
        assert!(!store.authenticate("testuser", "wrongpassword").unwrap());
        assert!(!store.authenticate("nobody", "password123").unwrap());
    }

    #[test]
    fn test_usernames_are_case_sensitive() {
        let store = create_test_store();
        store.create_account("TestUser", "pw").unwrap();

        assert!(!store.authenticate("testuser", "pw").unwrap());
        store.create_account("testuser", "pw").unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_update_password() {
        let store = create_test_store();
        store.create_account("testuser", "old").unwrap();

        store.update_password("testuser", "old", "new").unwrap();

        assert!(store.authenticate("testuser", "new").unwrap());
        assert!(!store.authenticate("testuser", "old").unwrap());
    }

    #[test]
    fn test_update_password_wrong_old_password() {
        let store = create_test_store();
        store.create_account("testuser", "old").unwrap();

        let result = store.update_password("testuser", "guess", "new");

        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
        assert!(store.authenticate("testuser", "old").unwrap());
    }

    #[test]
    fn test_update_password_unknown_user() {
        let store = create_test_store();

        let result = store.update_password("nobody", "old", "new");
        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_count_and_exists() {
        let store = create_test_store();
        assert_eq!(store.count().unwrap(), 0);
        assert!(!store.exists("a").unwrap());

        store.create_account("a", "1").unwrap();
        store.create_account("b", "2").unwrap();
        assert_eq!(store.count().unwrap(), 2);
        assert!(store.exists("a").unwrap());
    }
}
