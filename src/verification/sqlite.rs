//! SQLite-backed verification token store for deployments where pending
//! verifications must survive a restart.
//! Used by: state.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Result, lock_err};
use crate::verification::clock::{Clock, SystemClock};
use crate::verification::token::{VerificationToken, generate_value};
use crate::verification::{TokenStore, validate_identifier};

pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SqliteTokenStore {
    pub fn open(path: &str, ttl: Duration) -> Result<Self> {
        Self::open_with_clock(path, ttl, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: &str, ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS verification_tokens (
                identifier TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                issued_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
            ttl,
        })
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl TokenStore for SqliteTokenStore {
    fn issue(&self, identifier: &str) -> Result<String> {
        validate_identifier(identifier)?;
        let value = generate_value()?;
        let conn = self.conn.lock().map_err(lock_err("verification db"))?;
        let token = VerificationToken::new(identifier, value, self.clock.now(), self.ttl)?;
        conn.execute(
            "INSERT INTO verification_tokens (identifier, value, issued_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identifier) DO UPDATE SET
                value = excluded.value,
                issued_at = excluded.issued_at,
                expires_at = excluded.expires_at",
            params![
                token.identifier,
                token.value,
                token.issued_at.timestamp_millis(),
                token.expires_at.timestamp_millis()
            ],
        )?;
        Ok(token.value)
    }

    fn verify(&self, identifier: &str, presented: &str) -> Result<bool> {
        validate_identifier(identifier)?;
        let conn = self.conn.lock().map_err(lock_err("verification db"))?;
        let now = self.clock.now();

        let row = conn
            .query_row(
                "SELECT value, issued_at, expires_at FROM verification_tokens WHERE identifier = ?1",
                [identifier],
                |row| {
                    Ok(VerificationToken {
                        identifier: identifier.to_owned(),
                        value: row.get(0)?,
                        issued_at: from_millis(row.get(1)?),
                        expires_at: from_millis(row.get(2)?),
                    })
                },
            )
            .optional()?;

        let Some(token) = row else {
            return Ok(false);
        };
        if token.is_expired(now) {
            conn.execute("DELETE FROM verification_tokens WHERE identifier = ?1", [identifier])?;
            return Ok(false);
        }
        if !token.matches(presented) {
            return Ok(false);
        }
        let deleted = conn.execute(
            "DELETE FROM verification_tokens WHERE identifier = ?1 AND value = ?2",
            params![identifier, token.value],
        )?;
        Ok(deleted == 1)
    }

    fn purge_expired(&self) -> Result<usize> {
        let conn = self.conn.lock().map_err(lock_err("verification db"))?;
        let now = self.clock.now().timestamp_millis();
        let removed = conn.execute("DELETE FROM verification_tokens WHERE expires_at <= ?1", [now])?;
        Ok(removed)
    }

    fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().map_err(lock_err("verification db"))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM verification_tokens", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::verification::clock::ManualClock;

    fn store_with_clock() -> Result<(SqliteTokenStore, Arc<ManualClock>)> {
        let clock = Arc::new(ManualClock::default());
        let store = SqliteTokenStore::open_with_clock(":memory:", Duration::minutes(15), clock.clone())?;
        Ok((store, clock))
    }

    #[test]
    fn issued_token_verifies_exactly_once() -> Result<()> {
        let (store, _) = store_with_clock()?;
        let token = store.issue("a@x.com")?;
        assert!(store.verify("a@x.com", &token)?);
        assert!(!store.verify("a@x.com", &token)?);
        Ok(())
    }

    #[test]
    fn reissue_supersedes_previous_token() -> Result<()> {
        let (store, _) = store_with_clock()?;
        let first = store.issue("a@x.com")?;
        let second = store.issue("a@x.com")?;
        assert!(!store.verify("a@x.com", &first)?);
        assert!(store.verify("a@x.com", &second)?);
        Ok(())
    }

    #[test]
    fn wrong_value_keeps_row() -> Result<()> {
        let (store, _) = store_with_clock()?;
        store.issue("a@x.com")?;
        assert!(!store.verify("a@x.com", "guess")?);
        assert_eq!(store.len()?, 1);
        Ok(())
    }

    #[test]
    fn expired_token_rejected_and_removed() -> Result<()> {
        let (store, clock) = store_with_clock()?;
        let token = store.issue("b@x.com")?;
        clock.advance(Duration::minutes(16));
        assert!(!store.verify("b@x.com", &token)?);
        assert_eq!(store.len()?, 0);
        Ok(())
    }

    #[test]
    fn purge_removes_expired_rows() -> Result<()> {
        let (store, clock) = store_with_clock()?;
        store.issue("old@x.com")?;
        clock.advance(Duration::minutes(10));
        store.issue("new@x.com")?;
        clock.advance(Duration::minutes(5));
        assert_eq!(store.purge_expired()?, 1);
        assert_eq!(store.len()?, 1);
        Ok(())
    }

    #[test]
    fn empty_identifier_rejected() -> Result<()> {
        let (store, _) = store_with_clock()?;
        assert!(matches!(store.issue(""), Err(Error::InvalidInput(_))));
        assert!(matches!(store.verify("", "x"), Err(Error::InvalidInput(_))));
        Ok(())
    }

    #[test]
    fn rows_survive_reopen() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("verigate-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).map_err(|e| Error::Internal(e.to_string()))?;
        let path = dir.join("tokens.db");
        let path = path.to_string_lossy();

        let token = SqliteTokenStore::open(&path, Duration::minutes(15))?.issue("a@x.com")?;
        let reopened = SqliteTokenStore::open(&path, Duration::minutes(15))?;
        assert!(reopened.verify("a@x.com", &token)?);

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }
}
