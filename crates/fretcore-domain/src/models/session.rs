use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque random id, >=256 bits entropy, embedded in the JWT `sid` claim.
    pub session_id: String,
    pub user_id: i64,
    pub client_ip: Option<String>,
    pub client_hostname: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Session {
    /// A session is valid iff active, not expired, and (checked by the
    /// caller against the joined user row) the owning user is still active.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(now: DateTime<Utc>) -> Session {
        Session {
            session_id: "abc".into(),
            user_id: 1,
            client_ip: None,
            client_hostname: None,
            user_agent: None,
            created_at: now,
            last_activity: now,
            expires_at: now + Duration::hours(8),
            is_active: true,
        }
    }

    #[test]
    fn valid_when_active_and_unexpired() {
        let now = Utc::now();
        assert!(sample(now).is_valid(now));
    }

    #[test]
    fn invalid_when_expired() {
        let now = Utc::now();
        let s = sample(now);
        assert!(!s.is_valid(now + Duration::hours(9)));
    }

    #[test]
    fn invalid_when_revoked() {
        let now = Utc::now();
        let mut s = sample(now);
        s.is_active = false;
        assert!(!s.is_valid(now));
    }
}
