//! SQLite-backed account records.
//! Used by: handlers, state.

use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::accounts::{Account, DEFAULT_ROLE, NewAccount};
use crate::error::{Error, Result, lock_err};

pub struct AccountStore {
    conn: Mutex<Connection>,
}

const COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, role, profile_image_url, verified, created_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        role: row.get(5)?,
        profile_image_url: row.get(6)?,
        verified: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl AccountStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                profile_image_url TEXT,
                verified INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    pub fn create_pending(&self, new: NewAccount) -> Result<Account> {
        let conn = self.conn.lock().map_err(lock_err("accounts"))?;
        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            password_hash: new.password_hash,
            role: DEFAULT_ROLE.to_owned(),
            profile_image_url: None,
            verified: false,
            created_at: Utc::now().to_rfc3339(),
        };
        let inserted = conn.execute(
            "INSERT INTO accounts (id, first_name, last_name, email, password_hash, role, verified, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
             ON CONFLICT(email) DO NOTHING",
            params![
                account.id,
                account.first_name,
                account.last_name,
                account.email,
                account.password_hash,
                account.role,
                account.created_at
            ],
        )?;
        if inserted == 0 {
            return Err(Error::Conflict("user with this email already exists".into()));
        }
        Ok(account)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let conn = self.conn.lock().map_err(lock_err("accounts"))?;
        let account = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM accounts WHERE email = ?1"),
                [email],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    /// Promotes a pending account. Promoting an already verified account is a
    /// no-op that still returns it.
    pub fn mark_verified(&self, email: &str) -> Result<Option<Account>> {
        let conn = self.conn.lock().map_err(lock_err("accounts"))?;
        conn.execute("UPDATE accounts SET verified = 1 WHERE email = ?1", [email])?;
        let account = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM accounts WHERE email = ?1"),
                [email],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password_hash: "$2b$04$hash".into(),
        }
    }

    #[test]
    fn create_and_find_pending() -> Result<()> {
        let store = AccountStore::open_in_memory()?;
        let created = store.create_pending(new_account("a@x.com"))?;
        assert!(!created.verified);
        assert_eq!(created.role, "user");

        let found = store.find_by_email("a@x.com")?;
        assert_eq!(found, Some(created));
        Ok(())
    }

    #[test]
    fn duplicate_email_conflicts() -> Result<()> {
        let store = AccountStore::open_in_memory()?;
        store.create_pending(new_account("a@x.com"))?;
        let result = store.create_pending(new_account("a@x.com"));
        assert!(matches!(result, Err(Error::Conflict(_))));
        Ok(())
    }

    #[test]
    fn unknown_email_returns_none() -> Result<()> {
        let store = AccountStore::open_in_memory()?;
        assert!(store.find_by_email("nobody@x.com")?.is_none());
        assert!(store.mark_verified("nobody@x.com")?.is_none());
        Ok(())
    }

    #[test]
    fn mark_verified_promotes() -> Result<()> {
        let store = AccountStore::open_in_memory()?;
        store.create_pending(new_account("a@x.com"))?;
        let promoted = store.mark_verified("a@x.com")?;
        assert!(promoted.is_some_and(|a| a.verified));
        Ok(())
    }
}
