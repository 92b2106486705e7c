//! Pure lockout decision logic for the login algorithm. Callers own
//! persistence; these functions only compute the next state and the
//! user-facing message.

use chrono::{DateTime, Duration, Utc};

/// Outcome of checking whether an account is currently locked.
pub struct LockCheck {
    pub is_locked: bool,
    pub message: String,
    /// If the lockout had already expired, the caller should reset the
    /// counter and `locked_until` to `None` before proceeding.
    pub should_reset: bool,
}

pub fn check_locked(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> LockCheck {
    match locked_until {
        Some(until) if until > now => {
            let remaining_minutes = (until - now).num_seconds() / 60 + 1;
            LockCheck {
                is_locked: true,
                message: format!(
                    "compte verrouillé; réessayez dans {remaining_minutes} minutes"
                ),
                should_reset: false,
            }
        }
        Some(_) => LockCheck {
            is_locked: false,
            message: String::new(),
            should_reset: true,
        },
        None => LockCheck {
            is_locked: false,
            message: String::new(),
            should_reset: false,
        },
    }
}

/// Result of recording a failed login attempt.
pub struct FailedLoginOutcome {
    pub failed_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    pub message: String,
}

pub fn record_failed_login(
    current_attempts: i64,
    max_attempts: i64,
    lockout_minutes: i64,
    now: DateTime<Utc>,
) -> FailedLoginOutcome {
    let attempts = current_attempts + 1;
    if attempts >= max_attempts {
        FailedLoginOutcome {
            failed_attempts: attempts,
            locked_until: Some(now + Duration::minutes(lockout_minutes)),
            message: format!("Compte verrouillé pour {lockout_minutes} minutes."),
        }
    } else {
        let remaining = max_attempts - attempts;
        FailedLoginOutcome {
            failed_attempts: attempts,
            locked_until: None,
            message: format!(
                "Mot de passe incorrect. {remaining} tentative(s) restante(s)."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlocked_account_passes() {
        let c = check_locked(None, Utc::now());
        assert!(!c.is_locked);
        assert!(!c.should_reset);
    }

    #[test]
    fn active_lock_blocks() {
        let now = Utc::now();
        let c = check_locked(Some(now + Duration::minutes(5)), now);
        assert!(c.is_locked);
        assert!(c.message.contains("verrouillé"));
    }

    #[test]
    fn expired_lock_requests_reset() {
        let now = Utc::now();
        let c = check_locked(Some(now - Duration::minutes(1)), now);
        assert!(!c.is_locked);
        assert!(c.should_reset);
    }

    #[test]
    fn fifth_failure_locks_account() {
        let now = Utc::now();
        let outcome = record_failed_login(4, 5, 15, now);
        assert_eq!(outcome.failed_attempts, 5);
        assert!(outcome.locked_until.is_some());
        assert!(outcome.message.contains("Compte verrouillé pour 15"));
    }

    #[test]
    fn early_failure_reports_remaining_attempts() {
        let now = Utc::now();
        let outcome = record_failed_login(0, 5, 15, now);
        assert_eq!(outcome.failed_attempts, 1);
        assert!(outcome.locked_until.is_none());
        assert!(outcome.message.contains("4 tentative(s) restante(s)"));
    }

    #[test]
    fn sequence_of_failures_counts_down_to_zero_remaining() {
        let now = Utc::now();
        let expected = ["4", "3", "2", "1", "0"];
        let mut attempts = 0;
        for exp in expected {
            let outcome = record_failed_login(attempts, 5, 15, now);
            assert!(outcome.message.contains(&format!("{exp} tentative(s) restante(s)")) || outcome.locked_until.is_some());
            attempts = outcome.failed_attempts;
        }
        assert_eq!(attempts, 5);
    }
}
