//! Application-wide authentication state
//!
//! One [`AuthContext`] is created at start-up and handed to whatever needs
//! it. Clones share the same state, so every holder sees sign-in and
//! sign-out immediately.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::api::AuthApi;
use crate::auth::models::{CurrentUser, LoginRequest, LoginResponse, UserRecord};
use crate::auth::redirect::{role_home, Navigator, LOGIN_ROUTE};
use crate::auth::session::{derive_session, SessionState};
use crate::auth::store::SessionStore;
use crate::auth::token::decode_claims;
use crate::error::{Error, Result};

/// Point-in-time view of the context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<CurrentUser>,
    /// False until the stored session has been read
    pub hydrated: bool,
}

impl AuthState {
    pub fn is_hydrating(&self) -> bool {
        !self.hydrated
    }
}

#[derive(Clone)]
pub struct AuthContext {
    store: SessionStore,
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    state: Arc<RwLock<AuthState>>,
}

impl AuthContext {
    /// Create a context that has not hydrated yet
    pub fn new(store: SessionStore, api: Arc<dyn AuthApi>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store,
            api,
            navigator,
            state: Arc::new(RwLock::new(AuthState::default())),
        }
    }

    /// Read the stored session once and mark hydration finished
    pub async fn hydrate(&self) -> SessionState {
        self.hydrate_at(chrono::Utc::now().timestamp()).await
    }

    /// Hydrate against an explicit clock (Unix seconds)
    pub async fn hydrate_at(&self, now: i64) -> SessionState {
        let session = derive_session(&self.store, now);
        let mut state = self.state.write().await;
        state.user = session.user().cloned();
        state.hydrated = true;
        session
    }

    pub async fn current_user(&self) -> Option<CurrentUser> {
        self.state.read().await.user.clone()
    }

    pub async fn is_hydrating(&self) -> bool {
        self.state.read().await.is_hydrating()
    }

    pub async fn snapshot(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn navigate(&self, route: &str) {
        self.navigator.navigate(route);
    }

    /// Exchange credentials for a session and go to the role's home area.
    ///
    /// Concurrent calls are not deduplicated; whichever finishes last wins.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser> {
        let response = self.api.login(&LoginRequest::new(email, password)).await?;
        let user = resolve_identity(&response)?;

        let raw_user = response
            .user
            .as_ref()
            .filter(|value| !value.is_null())
            .map(|value| value.to_string());
        self.store.save(&response.access_token, raw_user.as_deref())?;

        {
            let mut state = self.state.write().await;
            state.user = Some(user.clone());
            state.hydrated = true;
        }

        tracing::info!("Signed in as {} ({})", user.email, user.role);
        self.navigator.navigate(role_home(user.role));
        Ok(user)
    }

    /// Forget the session and go to the login screen. Safe to call repeatedly.
    pub async fn sign_out(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear session storage: {}", e);
        }
        self.state.write().await.user = None;
        tracing::info!("Signed out");
        self.navigator.navigate(LOGIN_ROUTE);
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Identity from a login response: the response's user object first, with
/// any missing field filled from the freshly issued token. Hydration resolves
/// the cached copy the same way.
fn resolve_identity(response: &LoginResponse) -> Result<CurrentUser> {
    let record = response
        .user
        .as_ref()
        .and_then(UserRecord::from_value)
        .unwrap_or_default();
    let claims = decode_claims(&response.access_token);
    record
        .merge_claims(claims.as_ref())
        .ok_or(Error::InvalidToken)
}
