//! Reconstructing the signed-in identity from durable storage

use crate::auth::models::{CurrentUser, UserRecord};
use crate::auth::store::SessionStore;
use crate::auth::token::decode_claims;

/// What hydration found in storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// A usable identity
    Active(CurrentUser),
    /// The token had expired; storage has been cleared
    Expired,
    /// Nothing usable was stored
    Absent,
}

impl SessionState {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            SessionState::Active(user) => Some(user),
            _ => None,
        }
    }

    pub fn into_user(self) -> Option<CurrentUser> {
        match self {
            SessionState::Active(user) => Some(user),
            _ => None,
        }
    }
}

/// Derive the current user from the stored slots at time `now` (Unix seconds).
///
/// Resolution order:
/// 1. No token means no session. An orphaned user record is dropped.
/// 2. A token whose claims carry a past `exp` clears storage, whichever
///    source would otherwise supply the identity.
/// 3. The cached user record supplies the identity, with any field it lacks
///    taken from the token claims. An unreadable record counts as empty.
/// 4. Without an email and a role from either source there is no session.
///
/// Never fails; anything unreadable counts as absent.
pub fn derive_session(store: &SessionStore, now: i64) -> SessionState {
    let token = match store.read_token().filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => {
            if store.read_user().is_some() {
                tracing::debug!("Dropping cached user without a token");
                clear_quietly(store);
            }
            return SessionState::Absent;
        }
    };

    let claims = decode_claims(&token);
    if claims.as_ref().is_some_and(|c| c.is_expired_at(now)) {
        tracing::warn!("Stored session has expired, signing out");
        clear_quietly(store);
        return SessionState::Expired;
    }

    let record = store
        .read_user()
        .and_then(|raw| UserRecord::parse(&raw))
        .unwrap_or_default();

    match record.merge_claims(claims.as_ref()) {
        Some(user) => SessionState::Active(user),
        None => SessionState::Absent,
    }
}

/// Derive against the wall clock
pub fn hydrate(store: &SessionStore) -> SessionState {
    derive_session(store, chrono::Utc::now().timestamp())
}

fn clear_quietly(store: &SessionStore) {
    if let Err(e) = store.clear() {
        tracing::warn!("Failed to clear session storage: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{Role, SessionClaims};
    use crate::auth::token::encode_unsigned;

    const NOW: i64 = 1_700_000_000;

    fn token(email: Option<&str>, role: Option<Role>, exp: Option<i64>) -> String {
        encode_unsigned(&SessionClaims {
            sub: Some(11),
            email: email.map(str::to_string),
            name: Some("Token Name".to_string()),
            role,
            exp,
        })
        .unwrap()
    }

    #[test]
    fn test_empty_store_is_absent() {
        assert_eq!(derive_session(&SessionStore::in_memory(), NOW), SessionState::Absent);
    }

    #[test]
    fn test_claims_adopted_when_not_expired() {
        let store = SessionStore::in_memory();
        store
            .save(&token(Some("a@b.com"), Some(Role::Student), Some(NOW + 60)), None)
            .unwrap();

        let user = derive_session(&store, NOW).into_user().unwrap();
        assert_eq!(user.user_id, 11);
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.name.as_deref(), Some("Token Name"));
    }

    #[test]
    fn test_claims_without_expiry_are_accepted() {
        let store = SessionStore::in_memory();
        store.save(&token(Some("a@b.com"), Some(Role::Admin), None), None).unwrap();
        assert!(derive_session(&store, NOW).user().is_some());
    }

    #[test]
    fn test_expired_claims_clear_storage() {
        let store = SessionStore::in_memory();
        store
            .save(&token(Some("a@b.com"), Some(Role::Student), Some(NOW - 1)), None)
            .unwrap();

        assert_eq!(derive_session(&store, NOW), SessionState::Expired);
        assert!(store.read_token().is_none());
        assert!(store.read_user().is_none());
    }

    #[test]
    fn test_expired_token_overrides_cached_user() {
        let store = SessionStore::in_memory();
        store
            .save(
                &token(Some("a@b.com"), Some(Role::Student), Some(NOW - 1)),
                Some(r#"{"id":3,"email":"a@b.com","role":"STUDENT"}"#),
            )
            .unwrap();

        assert_eq!(derive_session(&store, NOW), SessionState::Expired);
        assert!(store.read_user().is_none());
    }

    #[test]
    fn test_cached_user_preferred_over_claims() {
        let store = SessionStore::in_memory();
        store
            .save(
                &token(Some("claims@b.com"), Some(Role::Student), Some(NOW + 60)),
                Some(r#"{"userId":42,"email":"cached@b.com","name":"Cached","role":"INSTRUCTOR"}"#),
            )
            .unwrap();

        let user = derive_session(&store, NOW).into_user().unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.email, "cached@b.com");
        assert_eq!(user.role, Role::Instructor);
    }

    #[test]
    fn test_cached_user_with_opaque_token() {
        let store = SessionStore::in_memory();
        store
            .save("opaque", Some(r#"{"id":8,"email":"o@b.com","role":"ADMIN"}"#))
            .unwrap();
        let user = derive_session(&store, NOW).into_user().unwrap();
        assert_eq!(user.user_id, 8);
    }

    #[test]
    fn test_incomplete_cache_is_merged_with_claims() {
        let store = SessionStore::in_memory();
        store
            .save(
                &token(Some("claims@b.com"), Some(Role::Admin), Some(NOW + 60)),
                Some(r#"{"id":3,"email":"cached@b.com"}"#),
            )
            .unwrap();
        let user = derive_session(&store, NOW).into_user().unwrap();
        assert_eq!(user.user_id, 3);
        assert_eq!(user.email, "cached@b.com");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name.as_deref(), Some("Token Name"));
    }

    #[test]
    fn test_malformed_cache_uses_claims() {
        let store = SessionStore::in_memory();
        store
            .save(
                &token(Some("a@b.com"), Some(Role::Admin), Some(NOW + 60)),
                Some("{not json"),
            )
            .unwrap();
        let user = derive_session(&store, NOW).into_user().unwrap();
        assert_eq!(user.user_id, 11);
        assert_eq!(user.email, "a@b.com");
    }

    #[test]
    fn test_incomplete_cache_with_opaque_token_is_absent() {
        let store = SessionStore::in_memory();
        store.save("opaque", Some(r#"{"id":3,"email":"a@b.com"}"#)).unwrap();
        assert_eq!(derive_session(&store, NOW), SessionState::Absent);
    }

    #[test]
    fn test_user_without_token_is_absent_and_dropped() {
        let store = SessionStore::in_memory();
        store.save("t", Some(r#"{"id":1,"email":"a@b.com","role":"STUDENT"}"#)).unwrap();
        // Simulate a half-cleared store
        store.save("", Some(r#"{"id":1,"email":"a@b.com","role":"STUDENT"}"#)).unwrap();

        assert_eq!(derive_session(&store, NOW), SessionState::Absent);
        assert!(store.read_user().is_none());
    }

    #[test]
    fn test_claims_missing_role_are_absent() {
        let store = SessionStore::in_memory();
        store.save(&token(Some("a@b.com"), None, Some(NOW + 60)), None).unwrap();
        assert_eq!(derive_session(&store, NOW), SessionState::Absent);
        // Not expired, so nothing is cleared
        assert!(store.read_token().is_some());
    }

    #[test]
    fn test_garbage_token_is_absent() {
        let store = SessionStore::in_memory();
        store.save("garbage", Some("{not json")).unwrap();
        assert_eq!(derive_session(&store, NOW), SessionState::Absent);
    }
}
