//! Navigation targets and the navigator seam

use crate::auth::models::Role;
use std::sync::Mutex;

pub const LOGIN_ROUTE: &str = "/login";
pub const DASHBOARD_ROUTE: &str = "/dashboard";
pub const STUDENT_ROUTE: &str = "/student";
pub const INSTRUCTOR_ROUTE: &str = "/instructor";
pub const ADMIN_ROUTE: &str = "/admin";

/// Landing area for a role after sign-in
pub fn role_home(role: Role) -> &'static str {
    match role {
        Role::Student => STUDENT_ROUTE,
        Role::Instructor => INSTRUCTOR_ROUTE,
        Role::Admin => ADMIN_ROUTE,
        Role::Unknown => DASHBOARD_ROUTE,
    }
}

/// Whatever moves the user between screens
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator that only remembers where it was sent
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn last(&self) -> Option<String> {
        self.history.lock().unwrap_or_else(|p| p.into_inner()).last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        tracing::debug!("Navigating to {}", route);
        self.history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(route.to_string());
    }
}
