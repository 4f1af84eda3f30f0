use chrono::Utc;
use rand::Rng;
use rusqlite::{params, OptionalExtension};

use super::identity::{premium_active, Identity};
use crate::db::models::{from_micros, Role};
use crate::error::AppResult;
use crate::state::DbPool;

/// Create a new session for a profile. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: &str, hours: u64) -> AppResult<String> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(pool: &DbPool, token: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Resolve an unexpired session token to the caller's identity.
pub fn resolve_session(pool: &DbPool, token: &str) -> AppResult<Option<Identity>> {
    let conn = pool.get()?;
    let row = conn
        .query_row(
            "SELECT p.id, p.role, p.is_premium, p.premium_expires_at FROM sessions s \
             JOIN profiles p ON p.id = s.user_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((user_id, role, is_premium, expires_at)) = row else {
        return Ok(None);
    };
    let Ok(role) = role.parse::<Role>() else {
        tracing::warn!(user = %user_id, role = %role, "session profile has unknown role");
        return Ok(None);
    };

    Ok(Some(Identity {
        user_id,
        role,
        is_premium: premium_active(is_premium, expires_at.map(from_micros), Utc::now()),
    }))
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}
