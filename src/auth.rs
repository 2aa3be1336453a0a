use crate::settings::load_system_config;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub code: String,
    pub message: String,
}

impl AuthError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }

    fn db(e: rusqlite::Error) -> Self {
        Self::new("db_query_failed", e.to_string())
    }

    /// One message for unknown user and wrong password alike.
    fn denied() -> Self {
        Self::new("auth_failed", "invalid username or password")
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub role: String,
    pub year_level: String,
    pub prev_grades: BTreeMap<String, i64>,
    pub last_confirmed_round: i64,
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn signup(
    conn: &Connection,
    username: &str,
    password: &str,
    year_level: &str,
    prev_grades: &BTreeMap<String, i64>,
) -> Result<(), AuthError> {
    let taken: Option<String> = conn
        .query_row(
            "SELECT username FROM users WHERE username = ?",
            [username],
            |r| r.get(0),
        )
        .optional()
        .map_err(AuthError::db)?;
    if taken.is_some() {
        return Err(AuthError::new("duplicate_user", "username already in use"));
    }

    let clamped: BTreeMap<String, i64> = prev_grades
        .iter()
        .map(|(s, g)| (s.clone(), (*g).min(crate::lifecycle::MAX_PREDICTION_BUCKET)))
        .collect();
    let grades_blob = serde_json::to_string(&clamped)
        .map_err(|e| AuthError::new("db_query_failed", e.to_string()))?;

    let salt = Uuid::new_v4().simple().to_string();
    let hash = hash_password(password, &salt);
    let cfg = load_system_config(conn);

    conn.execute(
        "INSERT INTO users(username, password_hash, salt, role, year_level, prev_grades, last_confirmed_round)
         VALUES(?, ?, ?, 'user', ?, ?, ?)",
        (
            username,
            &hash,
            &salt,
            year_level,
            &grades_blob,
            cfg.current_round,
        ),
    )
    .map_err(AuthError::db)?;
    Ok(())
}

pub fn login(conn: &Connection, username: &str, password: &str) -> Result<Account, AuthError> {
    let row: Option<(String, String, String, String, String, i64)> = conn
        .query_row(
            "SELECT password_hash, salt, role, year_level, prev_grades, last_confirmed_round
             FROM users WHERE username = ?",
            [username],
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                    r.get(5)?,
                ))
            },
        )
        .optional()
        .map_err(AuthError::db)?;

    let Some((stored_hash, salt, role, year_level, grades_blob, last_confirmed_round)) = row else {
        return Err(AuthError::denied());
    };
    if hash_password(password, &salt) != stored_hash {
        return Err(AuthError::denied());
    }

    let prev_grades: BTreeMap<String, i64> =
        serde_json::from_str(&grades_blob).unwrap_or_default();
    Ok(Account {
        username: username.to_string(),
        role,
        year_level,
        prev_grades,
        last_confirmed_round,
    })
}

pub fn fetch_account(conn: &Connection, username: &str) -> Result<Account, AuthError> {
    let row: Option<(String, String, String, i64)> = conn
        .query_row(
            "SELECT role, year_level, prev_grades, last_confirmed_round
             FROM users WHERE username = ?",
            [username],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()
        .map_err(AuthError::db)?;
    let Some((role, year_level, grades_blob, last_confirmed_round)) = row else {
        return Err(AuthError::new("not_found", "unknown user"));
    };
    let prev_grades: BTreeMap<String, i64> =
        serde_json::from_str(&grades_blob).unwrap_or_default();
    Ok(Account {
        username: username.to_string(),
        role,
        year_level,
        prev_grades,
        last_confirmed_round,
    })
}
