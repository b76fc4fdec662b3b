//! Client-side session and authorization

pub mod api;
pub mod context;
pub mod guard;
pub mod models;
pub mod redirect;
pub mod session;
pub mod store;
pub mod token;

pub use api::{AuthApi, HttpAuthApi};
pub use context::{AuthContext, AuthState};
pub use guard::{evaluate, DenyReason, GuardDecision, RouteGuard};
pub use models::{CurrentUser, LoginRequest, LoginResponse, Role, SessionClaims, UserRecord};
pub use redirect::{role_home, Navigator, RecordingNavigator};
pub use session::{derive_session, hydrate, SessionState};
pub use store::{FileStorage, MemoryStorage, SessionStore, Storage};
pub use token::decode_claims;
