//! AuthCore (C2): password hashing/strength policy, lockout, session
//! issuance/validation, and permission resolution. Everything here is
//! orchestration over [`Store`] and the pure helpers in `fretcore_auth`.

use std::sync::Arc;

use chrono::{Duration, Utc};

use fretcore_auth::{hash_password, lockout, verify_password, JwtCodec, TokenStatus};
use fretcore_domain::capability::{Capabilities, Capability};
use fretcore_domain::config::AuthConfig;
use fretcore_domain::models::role::Role;
use fretcore_domain::models::session::Session;
use fretcore_domain::models::user::{effective_permissions, User};
use fretcore_domain::trace::TraceEvent;
use fretcore_domain::{Error, Result};

use crate::store::Store;

/// A resolved, validated caller: the user, its role, the session it is
/// acting under, and its effective permission snapshot.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub role: Role,
    pub session: Session,
    pub permissions: Capabilities,
}

impl AuthContext {
    /// Pipeline step 2: 403 with the literal French body shape if the
    /// capability is absent.
    pub fn require(&self, cap: Capability) -> Result<()> {
        if self.permissions.get(cap) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!("Permission '{}' requise", cap.name())))
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    pub expires_at: chrono::DateTime<Utc>,
    pub must_change_password: bool,
    pub user: User,
    pub role: Role,
    pub permissions: Capabilities,
}

pub struct AuthCore {
    store: Arc<Store>,
    jwt: JwtCodec,
    config: AuthConfig,
}

impl AuthCore {
    pub fn new(store: Arc<Store>, secret: &str, config: AuthConfig) -> Self {
        Self { store, jwt: JwtCodec::new(secret), config }
    }

    fn role_for(&self, role_id: i64) -> Result<Role> {
        self.store
            .get_role(role_id)?
            .ok_or_else(|| Error::Internal(format!("role {role_id} referenced by user is missing")))
    }

    /// §4.2 login algorithm, steps 1-6. Lockout is checked before password
    /// verification: a correct password on a locked account still fails.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        client_ip: Option<&str>,
        client_hostname: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<LoginOutcome> {
        let normalized = User::normalize_username(username);
        let now = Utc::now();

        let user = self
            .store
            .get_user_by_username(&normalized)?
            .ok_or_else(|| {
                TraceEvent::LoginFailed { username: normalized.clone(), reason: "not_found".into() }.emit();
                Error::AuthFailed("invalid credentials".into())
            })?;

        if !user.is_active {
            TraceEvent::LoginFailed { username: normalized.clone(), reason: "disabled".into() }.emit();
            return Err(Error::AuthFailed("disabled".into()));
        }

        let lock = lockout::check_locked(user.locked_until, now);
        if lock.is_locked {
            TraceEvent::LoginFailed { username: normalized.clone(), reason: "locked".into() }.emit();
            return Err(Error::AuthFailed(lock.message));
        }
        if lock.should_reset {
            self.store.clear_lockout(user.id)?;
        }

        if !verify_password(password, &user.password_hash) {
            let outcome = lockout::record_failed_login(
                user.failed_attempts,
                self.config.max_failed_attempts,
                self.config.lockout_minutes,
                now,
            );
            self.store.record_failed_login(user.id, outcome.failed_attempts, outcome.locked_until)?;
            if outcome.locked_until.is_some() {
                TraceEvent::AccountLocked {
                    username: normalized.clone(),
                    lockout_minutes: self.config.lockout_minutes,
                }
                .emit();
            } else {
                TraceEvent::LoginFailed { username: normalized.clone(), reason: "bad_password".into() }.emit();
            }
            return Err(Error::AuthFailed(outcome.message));
        }

        self.store.record_login_success(user.id)?;
        let session_id = uuid::Uuid::new_v4().to_string();
        let expires_at = now + Duration::hours(self.config.session_hours);
        let session = self.store.create_session(
            &session_id,
            user.id,
            client_ip,
            client_hostname,
            user_agent,
            expires_at,
        )?;
        let access_token = self.jwt.encode(&normalized, &session.session_id, expires_at)?;
        let role = self.role_for(user.role_id)?;
        let permissions = effective_permissions(&user, &role);

        TraceEvent::LoginSucceeded { username: normalized.clone(), session_id: session.session_id.clone() }
            .emit();

        Ok(LoginOutcome {
            access_token,
            expires_at,
            must_change_password: user.must_change_password,
            user: User { last_login: Some(now), failed_attempts: 0, locked_until: None, ..user },
            role,
            permissions,
        })
    }

    /// Decode the bearer token, resolve its session, bump `last_activity`,
    /// and check the session/user are both still live. Used by every
    /// authenticated handler and by the `/ws` upgrade path.
    pub fn validate_token(&self, token: &str) -> Result<AuthContext> {
        let claims = self.jwt.decode(token)?;
        self.resolve_session(&claims.sid)
    }

    /// Same validation, but classifies the failure for the `/ws` handler's
    /// close-code choice (4001 expired vs 4002 invalid) instead of
    /// collapsing both into a generic 401.
    pub fn validate_token_for_ws(&self, token: &str) -> std::result::Result<AuthContext, WsAuthFailure> {
        match self.jwt.decode_status(token) {
            TokenStatus::Expired => Err(WsAuthFailure::Expired),
            TokenStatus::Invalid => Err(WsAuthFailure::Invalid),
            TokenStatus::Valid(claims) => {
                self.resolve_session(&claims.sid).map_err(|_| WsAuthFailure::Invalid)
            }
        }
    }

    fn resolve_session(&self, session_id: &str) -> Result<AuthContext> {
        let session = self
            .store
            .get_session(session_id)?
            .ok_or_else(|| Error::AuthFailed("unknown session".into()))?;
        let now = Utc::now();
        if !session.is_valid(now) {
            return Err(Error::AuthFailed("session expired or revoked".into()));
        }
        let user = self
            .store
            .get_user(session.user_id)?
            .ok_or_else(|| Error::AuthFailed("unknown user".into()))?;
        if !user.is_active {
            return Err(Error::AuthFailed("disabled".into()));
        }
        self.store.touch_session(session_id)?;
        let role = self.role_for(user.role_id)?;
        let permissions = effective_permissions(&user, &role);
        Ok(AuthContext { user, role, session, permissions })
    }

    /// Issues a new token/session and revokes the old one; any subsequent
    /// call bearing the old token is 401 (§8 round-trip property).
    pub fn refresh(
        &self,
        token: &str,
        client_ip: Option<&str>,
        client_hostname: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<LoginOutcome> {
        let ctx = self.validate_token(token)?;
        self.store.revoke_session(&ctx.session.session_id)?;
        let now = Utc::now();
        let session_id = uuid::Uuid::new_v4().to_string();
        let expires_at = now + Duration::hours(self.config.session_hours);
        let session = self.store.create_session(
            &session_id,
            ctx.user.id,
            client_ip,
            client_hostname,
            user_agent,
            expires_at,
        )?;
        let access_token = self.jwt.encode(&ctx.user.username, &session.session_id, expires_at)?;
        Ok(LoginOutcome {
            access_token,
            expires_at,
            must_change_password: ctx.user.must_change_password,
            user: ctx.user,
            role: ctx.role,
            permissions: ctx.permissions,
        })
    }

    pub fn logout(&self, ctx: &AuthContext) -> Result<()> {
        self.store.revoke_session(&ctx.session.session_id)
    }

    /// Verifies the current password, enforces strength policy, refuses a
    /// no-op change, then commits the new hash and clears the forced-change
    /// flag.
    pub fn change_password(&self, ctx: &AuthContext, current: &str, new: &str) -> Result<()> {
        if !verify_password(current, &ctx.user.password_hash) {
            return Err(Error::AuthFailed("current password incorrect".into()));
        }
        if current == new {
            return Err(Error::Validation("new password must be different".into()));
        }
        fretcore_auth::validate_password_strength(new)?;
        let hash = hash_password(new)?;
        self.store.set_password(ctx.user.id, &hash, false)
    }

    /// Admin reset: generates a temporary password, forces a change on next
    /// login, and clears any lockout.
    pub fn admin_reset_password(&self, user_id: i64) -> Result<String> {
        let temp = fretcore_auth::generate_temp_password();
        let hash = hash_password(&temp)?;
        self.store.set_password(user_id, &hash, true)?;
        self.store.clear_lockout(user_id)?;
        Ok(temp)
    }

    /// §8 scenario 6: invalidates every active session for a username.
    /// Returns the session ids that were live so the caller can evict them
    /// from the push hub.
    pub fn force_disconnect(&self, username: &str) -> Result<Vec<String>> {
        let normalized = User::normalize_username(username);
        let user = self
            .store
            .get_user_by_username(&normalized)?
            .ok_or_else(|| Error::NotFound(format!("user {normalized}")))?;
        self.store.revoke_all_sessions_for_user(user.id)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

/// Why `/ws` could not admit a client — maps 1:1 to close codes 4001/4002.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsAuthFailure {
    Expired,
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fretcore_domain::capability::Capabilities;

    fn core_with_user(role_name: &str, password: &str) -> (AuthCore, String) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let role = store
            .seed_role(role_name, role_name, fretcore_domain::capability::seed_capabilities(role_name))
            .unwrap();
        let hash = hash_password(password).unwrap();
        let user = store
            .create_user("U1", "User One", None, &hash, false, false, role.id)
            .unwrap();
        let core = AuthCore::new(store, "test-secret-at-least-32-bytes-long!!", AuthConfig::default());
        (core, user.username)
    }

    #[test]
    fn correct_password_issues_token_and_session() {
        let (core, username) = core_with_user("viewer", "Sup3rSecret");
        let outcome = core.login(&username, "Sup3rSecret", None, None, None).unwrap();
        assert!(!outcome.access_token.is_empty());
        let ctx = core.validate_token(&outcome.access_token).unwrap();
        assert_eq!(ctx.user.username, username);
    }

    #[test]
    fn lockout_rejects_even_correct_password_until_expiry() {
        let (core, username) = core_with_user("viewer", "Sup3rSecret");
        for _ in 0..5 {
            assert!(core.login(&username, "WrongPassword1", None, None, None).is_err());
        }
        let err = core.login(&username, "Sup3rSecret", None, None, None).unwrap_err();
        assert!(matches!(err, Error::AuthFailed(_)));
    }

    #[test]
    fn logout_then_reusing_session_is_rejected() {
        let (core, username) = core_with_user("viewer", "Sup3rSecret");
        let outcome = core.login(&username, "Sup3rSecret", None, None, None).unwrap();
        let ctx = core.validate_token(&outcome.access_token).unwrap();
        core.logout(&ctx).unwrap();
        assert!(core.validate_token(&outcome.access_token).is_err());
    }

    #[test]
    fn refresh_invalidates_previous_token() {
        let (core, username) = core_with_user("viewer", "Sup3rSecret");
        let outcome = core.login(&username, "Sup3rSecret", None, None, None).unwrap();
        let refreshed = core.refresh(&outcome.access_token, None, None, None).unwrap();
        assert_ne!(refreshed.access_token, outcome.access_token);
        assert!(core.validate_token(&outcome.access_token).is_err());
        assert!(core.validate_token(&refreshed.access_token).is_ok());
    }

    #[test]
    fn change_password_rejects_same_value() {
        let (core, username) = core_with_user("viewer", "Sup3rSecret");
        let outcome = core.login(&username, "Sup3rSecret", None, None, None).unwrap();
        let ctx = core.validate_token(&outcome.access_token).unwrap();
        let err = core.change_password(&ctx, "Sup3rSecret", "Sup3rSecret").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn force_disconnect_revokes_all_sessions() {
        let (core, username) = core_with_user("viewer", "Sup3rSecret");
        let a = core.login(&username, "Sup3rSecret", None, None, None).unwrap();
        let b = core.login(&username, "Sup3rSecret", None, None, None).unwrap();
        let revoked = core.force_disconnect(&username).unwrap();
        assert_eq!(revoked.len(), 2);
        assert!(core.validate_token(&a.access_token).is_err());
        assert!(core.validate_token(&b.access_token).is_err());
    }

    #[test]
    fn admin_reset_forces_change_and_clears_lockout() {
        let (core, username) = core_with_user("viewer", "Sup3rSecret");
        for _ in 0..5 {
            let _ = core.login(&username, "WrongPassword1", None, None, None);
        }
        let user = core.store.get_user_by_username(&username).unwrap().unwrap();
        let temp = core.admin_reset_password(user.id).unwrap();
        let outcome = core.login(&username, &temp, None, None, None).unwrap();
        assert!(outcome.must_change_password);
    }

    #[test]
    fn permission_check_reports_literal_french_message() {
        let (core, username) = core_with_user("viewer", "Sup3rSecret");
        let outcome = core.login(&username, "Sup3rSecret", None, None, None).unwrap();
        let ctx = core.validate_token(&outcome.access_token).unwrap();
        let err = ctx.require(Capability::EditPlanning).unwrap_err();
        match err {
            Error::Forbidden(msg) => assert_eq!(msg, "Permission 'edit_planning' requise"),
            _ => panic!("expected Forbidden"),
        }
    }

    #[test]
    fn system_admin_bypasses_role_bits() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let role = store.seed_role("viewer", "viewer", Capabilities::none()).unwrap();
        let hash = hash_password("Sup3rSecret").unwrap();
        store.create_user("ADMIN1", "Admin", None, &hash, false, true, role.id).unwrap();
        let core = AuthCore::new(store, "test-secret-at-least-32-bytes-long!!", AuthConfig::default());
        let outcome = core.login("ADMIN1", "Sup3rSecret", None, None, None).unwrap();
        assert_eq!(outcome.permissions, Capabilities::all());
    }
}
