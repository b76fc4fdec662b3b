//! Quizdesk - client-side sessions for the quiz platform
//!
//! This is the library interface for Quizdesk: token decoding, durable
//! session storage, hydration, sign-in/sign-out and role-based route guards.

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;

pub use auth::{AuthContext, CurrentUser, Role, RouteGuard, SessionStore};
pub use config::Config;
pub use error::Error;
