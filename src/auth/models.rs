//! Identity models and wire formats

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Platform roles. Anything the backend sends that is not one of the three
/// known roles is kept as `Unknown` rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Student,
    Instructor,
    Admin,
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "STUDENT"),
            Role::Instructor => write!(f, "INSTRUCTOR"),
            Role::Admin => write!(f, "ADMIN"),
            Role::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Role::Student,
            "INSTRUCTOR" => Role::Instructor,
            "ADMIN" => Role::Admin,
            _ => Role::Unknown,
        })
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(Role::Unknown)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

/// Claims carried in the payload segment of a bearer token.
///
/// Every field is optional: the codec returns whatever the payload holds and
/// callers decide which fields they require.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub sub: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Expiration, Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl SessionClaims {
    /// Check expiry against an explicit clock. A token without `exp` never expires.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp < now)
    }

    /// Check expiry against the wall clock
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    /// Map to a current user, provided both email and role are present
    pub fn to_current_user(&self) -> Option<CurrentUser> {
        UserRecord::default().merge_claims(Some(self))
    }
}

/// The signed-in identity, held in memory only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// 0 when the backend never told us
    pub user_id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl CurrentUser {
    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// A user record as the backend and the session cache spell it.
///
/// Two identifier spellings exist in the wild. `userId` takes priority over
/// `id` when both are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    #[serde(default, rename = "userId", deserialize_with = "lenient_id")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl UserRecord {
    /// Parse a serialized record; shape mismatches read as absent
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        Self::from_value(&value)
    }

    /// Interpret a JSON payload; `null` and non-objects read as absent
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn identifier(&self) -> Option<i64> {
        self.user_id.or(self.id)
    }

    /// Resolve an identity from this record, filling each missing field from
    /// the token claims. Sign-in and hydration both go through here, so a
    /// cached record always resolves to the user it was saved for.
    ///
    /// Returns `None` when email or role is missing from both sources.
    pub fn merge_claims(&self, claims: Option<&SessionClaims>) -> Option<CurrentUser> {
        let email = [
            self.email.as_deref(),
            claims.and_then(|c| c.email.as_deref()),
        ]
        .into_iter()
        .flatten()
        .find(|e| !e.is_empty())?;
        let role = self.role.or_else(|| claims.and_then(|c| c.role))?;

        Some(CurrentUser {
            user_id: self
                .identifier()
                .or_else(|| claims.and_then(|c| c.sub))
                .unwrap_or(0),
            email: email.to_string(),
            name: self
                .name
                .clone()
                .or_else(|| claims.and_then(|c| c.name.clone())),
            role,
        })
    }
}

/// Login credentials
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login payload
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "accessToken", alias = "token")]
    pub access_token: String,
    /// Kept raw so it can be cached exactly as received
    #[serde(default)]
    pub user: Option<Value>,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Numeric identifiers arrive as numbers or numeric strings; anything else is absent
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_value))
}

fn id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
