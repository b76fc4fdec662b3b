//! Route access decisions
//!
//! Each evaluation is independent; nothing carries over between navigations
//! except what the [`AuthContext`] holds.

use crate::auth::context::{AuthContext, AuthState};
use crate::auth::models::Role;
use crate::auth::redirect::{DASHBOARD_ROUTE, LOGIN_ROUTE};

/// Why access was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No signed-in user or no token
    Unauthenticated,
    /// Signed in, but the role is not on the allow-list
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Identity not known yet: render nothing and do not redirect
    Hydrating,
    Unauthorized {
        redirect_to: &'static str,
        reason: DenyReason,
    },
    Authorized,
}

impl GuardDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, GuardDecision::Authorized)
    }

    pub fn redirect_target(&self) -> Option<&'static str> {
        match *self {
            GuardDecision::Unauthorized { redirect_to, .. } => Some(redirect_to),
            _ => None,
        }
    }
}

/// Decide access for one navigation.
///
/// `allowed` of `None` admits any signed-in user. A role mismatch redirects
/// to the dashboard rather than a dedicated forbidden page; the reason is
/// reported so callers can tell the two refusals apart.
pub fn evaluate(state: &AuthState, has_token: bool, allowed: Option<&[Role]>) -> GuardDecision {
    if state.is_hydrating() {
        return GuardDecision::Hydrating;
    }

    let user = match &state.user {
        Some(user) if has_token => user,
        _ => {
            return GuardDecision::Unauthorized {
                redirect_to: LOGIN_ROUTE,
                reason: DenyReason::Unauthenticated,
            }
        }
    };

    if let Some(allowed) = allowed {
        if !user.has_role(allowed) {
            return GuardDecision::Unauthorized {
                redirect_to: DASHBOARD_ROUTE,
                reason: DenyReason::Forbidden,
            };
        }
    }

    GuardDecision::Authorized
}

/// A guard attached to one route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    allowed: Option<Vec<Role>>,
}

impl RouteGuard {
    /// Any signed-in user
    pub fn authenticated() -> Self {
        Self { allowed: None }
    }

    /// Only the listed roles. An empty list admits nobody.
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: Some(roles.into_iter().collect()),
        }
    }

    pub fn allowed(&self) -> Option<&[Role]> {
        self.allowed.as_deref()
    }

    /// Evaluate without side effects
    pub async fn check(&self, ctx: &AuthContext) -> GuardDecision {
        let state = ctx.snapshot().await;
        evaluate(&state, ctx.store().has_token(), self.allowed())
    }

    /// Produce the guarded content when authorized. On refusal the context
    /// navigates to the redirect target; while hydrating nothing happens.
    pub async fn render<T>(&self, ctx: &AuthContext, content: impl FnOnce() -> T) -> Option<T> {
        match self.check(ctx).await {
            GuardDecision::Authorized => Some(content()),
            GuardDecision::Unauthorized { redirect_to, reason } => {
                tracing::debug!("Guard refused access ({:?}), redirecting to {}", reason, redirect_to);
                ctx.navigate(redirect_to);
                None
            }
            GuardDecision::Hydrating => None,
        }
    }
}
