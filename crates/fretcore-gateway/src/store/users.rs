use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use fretcore_domain::capability::Capabilities;
use fretcore_domain::models::role::Role;
use fretcore_domain::models::session::Session;
use fretcore_domain::models::user::User;
use fretcore_domain::Result;

use super::{map_db_err, Store};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Roles
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn row_to_role(row: &Row<'_>) -> rusqlite::Result<Role> {
    let caps_json: String = row.get(3)?;
    let capabilities: Capabilities = serde_json::from_str(&caps_json).unwrap_or_default();
    Ok(Role { id: row.get(0)?, name: row.get(1)?, description: row.get(2)?, capabilities })
}

impl Store {
    pub fn list_roles(&self) -> Result<Vec<Role>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT id, name, description, capabilities_json FROM roles ORDER BY name ASC")
            .map_err(map_db_err)?;
        let rows = stmt.query_map([], row_to_role).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn get_role(&self, id: i64) -> Result<Option<Role>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, name, description, capabilities_json FROM roles WHERE id = ?1",
            params![id],
            row_to_role,
        )
        .optional()
        .map_err(map_db_err)
    }

    pub fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, name, description, capabilities_json FROM roles WHERE name = ?1",
            params![name],
            row_to_role,
        )
        .optional()
        .map_err(map_db_err)
    }

    /// Seeds the closed set of roles (§3) on first start. No-op if roles
    /// already exist (keyed on name uniqueness).
    pub fn seed_role(&self, name: &str, description: &str, capabilities: Capabilities) -> Result<Role> {
        if let Some(existing) = self.get_role_by_name(name)? {
            return Ok(existing);
        }
        let caps_json = serde_json::to_string(&capabilities).unwrap();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO roles (name, description, capabilities_json) VALUES (?1,?2,?3)",
            params![name, description, caps_json],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_role(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("role vanished after insert".into()))
    }

    /// Only callable under `manage_rights`; editing a role's capability
    /// vector (not its seed name).
    pub fn update_role_capabilities(&self, id: i64, capabilities: Capabilities) -> Result<Role> {
        let caps_json = serde_json::to_string(&capabilities).unwrap();
        let conn = self.lock();
        let affected = conn
            .execute(
                "UPDATE roles SET capabilities_json = ?1 WHERE id = ?2",
                params![caps_json, id],
            )
            .map_err(map_db_err)?;
        if affected == 0 {
            return Err(fretcore_domain::Error::NotFound(format!("role {id}")));
        }
        drop(conn);
        self.get_role(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("role vanished after update".into()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Users
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const USER_COLS: &str = "id, username, display_name, email, password_hash, must_change_password, \
    failed_attempts, locked_until, is_active, is_system_admin, role_id, last_login";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        must_change_password: row.get(5)?,
        failed_attempts: row.get(6)?,
        locked_until: row.get(7)?,
        is_active: row.get(8)?,
        is_system_admin: row.get(9)?,
        role_id: row.get(10)?,
        last_login: row.get(11)?,
    })
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub email: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub is_system_admin: Option<bool>,
    pub role_id: Option<i64>,
}

impl Store {
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock();
        let sql = format!("SELECT {USER_COLS} FROM users ORDER BY username ASC");
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let rows = stmt.query_map([], row_to_user).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn count_users(&self) -> Result<i64> {
        let conn = self.lock();
        conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0)).map_err(map_db_err)
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.lock();
        let sql = format!("SELECT {USER_COLS} FROM users WHERE id = ?1");
        conn.query_row(&sql, params![id], row_to_user).optional().map_err(map_db_err)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.lock();
        let sql = format!("SELECT {USER_COLS} FROM users WHERE username = ?1");
        conn.query_row(&sql, params![User::normalize_username(username)], row_to_user)
            .optional()
            .map_err(map_db_err)
    }

    /// `must_change_password` defaults true only when the caller did not
    /// supply an explicit password (i.e. one was auto-generated) — see §9.
    pub fn create_user(
        &self,
        username: &str,
        display_name: &str,
        email: Option<&str>,
        password_hash: &str,
        must_change_password: bool,
        is_system_admin: bool,
        role_id: i64,
    ) -> Result<User> {
        let normalized = User::normalize_username(username);
        let conn = self.lock();
        conn.execute(
            "INSERT INTO users (username, display_name, email, password_hash, \
             must_change_password, failed_attempts, locked_until, is_active, is_system_admin, \
             role_id, last_login) VALUES (?1,?2,?3,?4,?5,0,NULL,1,?6,?7,NULL)",
            params![
                normalized,
                display_name,
                email,
                password_hash,
                must_change_password,
                is_system_admin,
                role_id,
            ],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_user(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("user vanished after insert".into()))
    }

    pub fn update_user(&self, id: i64, patch: &UserPatch) -> Result<User> {
        let existing =
            self.get_user(id)?.ok_or_else(|| fretcore_domain::Error::NotFound(format!("user {id}")))?;
        let display_name = patch.display_name.clone().unwrap_or(existing.display_name);
        let email = patch.email.clone().unwrap_or(existing.email);
        let is_active = patch.is_active.unwrap_or(existing.is_active);
        let is_system_admin = patch.is_system_admin.unwrap_or(existing.is_system_admin);
        let role_id = patch.role_id.unwrap_or(existing.role_id);
        let conn = self.lock();
        conn.execute(
            "UPDATE users SET display_name=?1, email=?2, is_active=?3, is_system_admin=?4, \
             role_id=?5 WHERE id=?6",
            params![display_name, email, is_active, is_system_admin, role_id, id],
        )
        .map_err(map_db_err)?;
        drop(conn);
        self.get_user(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("user vanished after update".into()))
    }

    /// Soft-disables a user account (`is_active=false`); never removes the
    /// row so historical mission/audit attribution stays intact.
    pub fn deactivate_user(&self, id: i64) -> Result<User> {
        let existing =
            self.get_user(id)?.ok_or_else(|| fretcore_domain::Error::NotFound(format!("user {id}")))?;
        let conn = self.lock();
        conn.execute("UPDATE users SET is_active = 0 WHERE id = ?1", params![id])
            .map_err(map_db_err)?;
        Ok(User { is_active: false, ..existing })
    }

    pub fn set_password(&self, id: i64, password_hash: &str, must_change_password: bool) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE users SET password_hash=?1, must_change_password=?2 WHERE id=?3",
            params![password_hash, must_change_password, id],
        )
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Resets failed-attempt counter and lockout; used on successful login
    /// and by admin reset.
    pub fn clear_lockout(&self, id: i64) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE users SET failed_attempts = 0, locked_until = NULL WHERE id = ?1",
            params![id],
        )
        .map_err(map_db_err)?;
        Ok(())
    }

    pub fn record_failed_login(&self, id: i64, failed_attempts: i64, locked_until: Option<DateTime<Utc>>) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE users SET failed_attempts = ?1, locked_until = ?2 WHERE id = ?3",
            params![failed_attempts, locked_until, id],
        )
        .map_err(map_db_err)?;
        Ok(())
    }

    pub fn record_login_success(&self, id: i64) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE users SET failed_attempts = 0, locked_until = NULL, last_login = ?1 WHERE id = ?2",
            params![Utc::now(), id],
        )
        .map_err(map_db_err)?;
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const SESSION_COLS: &str = "session_id, user_id, client_ip, client_hostname, user_agent, \
    created_at, last_activity, expires_at, is_active";

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        session_id: row.get(0)?,
        user_id: row.get(1)?,
        client_ip: row.get(2)?,
        client_hostname: row.get(3)?,
        user_agent: row.get(4)?,
        created_at: row.get(5)?,
        last_activity: row.get(6)?,
        expires_at: row.get(7)?,
        is_active: row.get(8)?,
    })
}

impl Store {
    pub fn create_session(
        &self,
        session_id: &str,
        user_id: i64,
        client_ip: Option<&str>,
        client_hostname: Option<&str>,
        user_agent: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let now = Utc::now();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO sessions (session_id, user_id, client_ip, client_hostname, user_agent, \
             created_at, last_activity, expires_at, is_active) VALUES (?1,?2,?3,?4,?5,?6,?6,?7,1)",
            params![session_id, user_id, client_ip, client_hostname, user_agent, now, expires_at],
        )
        .map_err(map_db_err)?;
        Ok(Session {
            session_id: session_id.to_string(),
            user_id,
            client_ip: client_ip.map(String::from),
            client_hostname: client_hostname.map(String::from),
            user_agent: user_agent.map(String::from),
            created_at: now,
            last_activity: now,
            expires_at,
            is_active: true,
        })
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let conn = self.lock();
        let sql = format!("SELECT {SESSION_COLS} FROM sessions WHERE session_id = ?1");
        conn.query_row(&sql, params![session_id], row_to_session).optional().map_err(map_db_err)
    }

    pub fn touch_session(&self, session_id: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE sessions SET last_activity = ?1 WHERE session_id = ?2",
            params![Utc::now(), session_id],
        )
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Revokes a single session (logout). `is_active` never reverts once false.
    pub fn revoke_session(&self, session_id: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE sessions SET is_active = 0 WHERE session_id = ?1",
            params![session_id],
        )
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Force-disconnect: invalidates every active session for a user.
    /// Returns the session ids that were live (so the hub can evict them).
    pub fn revoke_all_sessions_for_user(&self, user_id: i64) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT session_id FROM sessions WHERE user_id = ?1 AND is_active = 1")
            .map_err(map_db_err)?;
        let ids: Vec<String> = stmt
            .query_map(params![user_id], |r| r.get(0))
            .map_err(map_db_err)?
            .collect::<rusqlite::Result<_>>()
            .map_err(map_db_err)?;
        drop(stmt);
        conn.execute(
            "UPDATE sessions SET is_active = 0 WHERE user_id = ?1 AND is_active = 1",
            params![user_id],
        )
        .map_err(map_db_err)?;
        Ok(ids)
    }

    pub fn revoke_session_by_id(&self, session_id: &str) -> Result<()> {
        self.revoke_session(session_id)
    }

    pub fn list_active_sessions(&self) -> Result<Vec<Session>> {
        let conn = self.lock();
        let sql = format!("SELECT {SESSION_COLS} FROM sessions WHERE is_active = 1 ORDER BY last_activity DESC");
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let rows = stmt.query_map([], row_to_session).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    /// Marks every session with `expires_at <= now` inactive; run by the
    /// scheduler's per-minute sweep. Returns the count swept.
    pub fn sweep_expired_sessions(&self) -> Result<usize> {
        let conn = self.lock();
        conn.execute(
            "UPDATE sessions SET is_active = 0 WHERE is_active = 1 AND expires_at <= ?1",
            params![Utc::now()],
        )
        .map_err(map_db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn seed_role_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let a = store.seed_role("viewer", "Viewer", Capabilities::none()).unwrap();
        let b = store.seed_role("viewer", "Viewer", Capabilities::all()).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.capabilities, Capabilities::none());
    }

    #[test]
    fn username_normalized_on_create_and_lookup() {
        let store = Store::open_in_memory().unwrap();
        let role = store.seed_role("viewer", "Viewer", Capabilities::none()).unwrap();
        store.create_user("corp\\jdoe", "Jean Doe", None, "hash", false, false, role.id).unwrap();
        let fetched = store.get_user_by_username("JDOE").unwrap().unwrap();
        assert_eq!(fetched.username, "JDOE");
    }

    #[test]
    fn revoke_all_sessions_for_user_is_exhaustive() {
        let store = Store::open_in_memory().unwrap();
        let role = store.seed_role("viewer", "Viewer", Capabilities::none()).unwrap();
        let user = store.create_user("U1", "U1", None, "hash", false, false, role.id).unwrap();
        let exp = Utc::now() + Duration::hours(8);
        store.create_session("s1", user.id, None, None, None, exp).unwrap();
        store.create_session("s2", user.id, None, None, None, exp).unwrap();
        let revoked = store.revoke_all_sessions_for_user(user.id).unwrap();
        assert_eq!(revoked.len(), 2);
        assert!(store.get_session("s1").unwrap().unwrap().is_active == false);
    }

    #[test]
    fn sweep_marks_expired_inactive_without_reviving_revoked() {
        let store = Store::open_in_memory().unwrap();
        let role = store.seed_role("viewer", "Viewer", Capabilities::none()).unwrap();
        let user = store.create_user("U1", "U1", None, "hash", false, false, role.id).unwrap();
        let past = Utc::now() - Duration::minutes(1);
        store.create_session("s1", user.id, None, None, None, past).unwrap();
        let swept = store.sweep_expired_sessions().unwrap();
        assert_eq!(swept, 1);
        assert!(!store.get_session("s1").unwrap().unwrap().is_active);
    }
}
