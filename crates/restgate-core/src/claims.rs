//! Caller identity for one request.

use serde::{Deserialize, Serialize};

/// Authenticated identity of the caller.
///
/// Created when a request enters, consumed once by the RLS transaction
/// wrapper, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user id), exposed as `request.jwt.claim.sub`.
    #[serde(rename = "sub")]
    pub subject: String,
    /// Application role, exposed as `request.jwt.claim.role`.
    pub role: String,
    /// Email, exposed as `request.jwt.claim.email`.
    #[serde(default)]
    pub email: String,
}

impl SessionClaims {
    pub fn new(
        subject: impl Into<String>,
        role: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
            email: email.into(),
        }
    }

    /// The claims as a JSON object (`{"sub", "role", "email"}`), for the
    /// aggregate `request.jwt.claims` setting.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sub": self.subject,
            "role": self.role,
            "email": self.email,
        })
    }
}
