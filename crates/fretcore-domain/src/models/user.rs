use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Normalized: domain prefix stripped, upper-cased.
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub must_change_password: bool,
    pub failed_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_system_admin: bool,
    pub role_id: i64,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Normalizes a raw login username: accepts `DOMAIN\user`, `DOMAIN/user`,
    /// or a bare `user`; returns the bare username upper-cased.
    pub fn normalize_username(raw: &str) -> String {
        let trimmed = raw.trim();
        let stripped = if let Some(idx) = trimmed.rfind('\\') {
            &trimmed[idx + 1..]
        } else if let Some(idx) = trimmed.rfind('/') {
            &trimmed[idx + 1..]
        } else {
            trimmed
        };
        stripped.to_uppercase()
    }
}

/// Effective permissions as returned over the wire: the role's capability
/// vector, or every bit set for a system admin regardless of role.
pub fn effective_permissions(user: &User, role: &crate::models::role::Role) -> Capabilities {
    if user.is_system_admin {
        Capabilities::all()
    } else {
        role.capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslash_domain() {
        assert_eq!(User::normalize_username(r"CORP\jdoe"), "JDOE");
    }

    #[test]
    fn normalizes_forward_slash_domain() {
        assert_eq!(User::normalize_username("CORP/jdoe"), "JDOE");
    }

    #[test]
    fn normalizes_bare_username() {
        assert_eq!(User::normalize_username("  jdoe  "), "JDOE");
    }
}
