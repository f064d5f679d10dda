//! Session and identity types shared by the console crates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role claim that grants access to the administrative views
pub const ADMIN_ROLE: &str = "ADMIN";

/// Role claim carried by an authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Administrative role
    Admin,
    /// Any other role, kept verbatim (e.g. `CITIZEN`)
    Other(String),
}

impl Role {
    /// Whether this role grants administrative access
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Wire representation of the role
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => ADMIN_ROLE,
            Self::Other(role) => role,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value == ADMIN_ROLE {
            Self::Admin
        } else {
            Self::Other(value)
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => ADMIN_ROLE.to_string(),
            Role::Other(role) => role,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend identifier of a user, numeric or textual depending on the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// Numeric identifier
    Number(i64),
    /// Textual identifier
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Authenticated identity as returned by the OTP verification endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Role claim
    pub role: Role,

    /// Backend identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    /// Remaining fields returned by the backend, preserved across persistence
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Create a user with the given role and identifier
    #[must_use]
    pub fn new(role: impl Into<Role>, user_id: Option<UserId>) -> Self {
        Self {
            role: role.into(),
            user_id,
            extra: serde_json::Map::new(),
        }
    }

    /// Convenience constructor for an administrator
    #[must_use]
    pub fn admin(user_id: i64) -> Self {
        Self::new(Role::Admin, Some(UserId::Number(user_id)))
    }

    /// Label shown in the console chrome, e.g. `Admin-7`
    #[must_use]
    pub fn display_label(&self) -> String {
        self.user_id
            .as_ref()
            .map_or_else(|| "Admin-".to_string(), |id| format!("Admin-{id}"))
    }
}

/// Client-held proof of authentication plus the authenticated identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer credential
    pub token: String,

    /// Authenticated identity
    pub user: User,
}

impl Session {
    /// Create a new session
    #[must_use]
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// Whether a non-empty token is held
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Whether this session may render protected views
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_token() && self.user.role.is_admin()
    }
}

/// Inner state of the persisted session envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Stored token, `null` once logged out
    #[serde(default)]
    pub token: Option<String>,

    /// Stored identity, `null` once logged out
    #[serde(default)]
    pub user: Option<User>,
}

/// Durable form of the session: `{ "state": { "token", "user" }, "version" }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Session state, absent in envelopes written by older clients
    #[serde(default)]
    pub state: Option<PersistedState>,

    /// Envelope format version
    #[serde(default)]
    pub version: u32,
}

impl PersistedSession {
    /// Envelope holding the given session, or a cleared envelope for `None`
    #[must_use]
    pub fn from_session(session: Option<&Session>) -> Self {
        let state = session.map_or_else(PersistedState::default, |session| PersistedState {
            token: Some(session.token.clone()),
            user: Some(session.user.clone()),
        });

        Self {
            state: Some(state),
            version: 0,
        }
    }

    /// Stored token, if any and non-empty
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.state
            .as_ref()
            .and_then(|state| state.token.as_deref())
            .filter(|token| !token.is_empty())
    }

    /// Rebuild the session held by this envelope
    ///
    /// A session exists only when both a non-empty token and a user are stored.
    #[must_use]
    pub fn into_session(self) -> Option<Session> {
        let state = self.state?;
        match (state.token, state.user) {
            (Some(token), Some(user)) if !token.is_empty() => Some(Session::new(token, user)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("ADMIN", true)]
    #[case("CITIZEN", false)]
    #[case("admin", false)]
    #[case("", false)]
    fn test_role_parsing(#[case] raw: &str, #[case] is_admin: bool) {
        let role = Role::from(raw);
        assert_eq!(role.is_admin(), is_admin);
        assert_eq!(role.as_str(), raw);
    }

    #[test]
    fn test_user_deserializes_verify_response_shape() {
        let user: User = serde_json::from_str(
            r#"{"role":"ADMIN","userId":7,"phone":"9876543210","name":"Ops"}"#,
        )
        .unwrap();

        assert!(user.role.is_admin());
        assert_eq!(user.user_id, Some(UserId::Number(7)));
        assert_eq!(user.extra.get("phone").unwrap(), "9876543210");
        assert_eq!(user.display_label(), "Admin-7");
    }

    #[test]
    fn test_user_without_identifier() {
        let user: User = serde_json::from_str(r#"{"role":"CITIZEN"}"#).unwrap();
        assert_eq!(user.role, Role::Other("CITIZEN".to_string()));
        assert!(user.user_id.is_none());
    }

    #[test]
    fn test_session_admin_requires_token_and_role() {
        assert!(Session::new("abc", User::admin(1)).is_admin());
        assert!(!Session::new("", User::admin(1)).is_admin());
        assert!(!Session::new("abc", User::new("CITIZEN", None)).is_admin());
    }

    #[test]
    fn test_envelope_wire_format() {
        let session = Session::new("abc", User::admin(3));
        let json = serde_json::to_value(PersistedSession::from_session(Some(&session))).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "state": { "token": "abc", "user": { "role": "ADMIN", "userId": 3 } },
                "version": 0
            })
        );
    }

    #[test]
    fn test_cleared_envelope_has_null_state() {
        let json = serde_json::to_value(PersistedSession::from_session(None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "state": { "token": null, "user": null }, "version": 0 })
        );
    }

    #[test]
    fn test_envelope_round_trip_preserves_session() {
        let mut user = User::new("ADMIN", Some(UserId::Text("u-19".to_string())));
        user.extra
            .insert("district".to_string(), serde_json::json!("Pune"));
        let session = Session::new("tok", user);

        let raw = serde_json::to_string(&PersistedSession::from_session(Some(&session))).unwrap();
        let restored = serde_json::from_str::<PersistedSession>(&raw)
            .unwrap()
            .into_session();

        assert_eq!(restored, Some(session));
    }

    #[test]
    fn test_envelope_without_state() {
        let envelope: PersistedSession = serde_json::from_str("{}").unwrap();
        assert!(envelope.token().is_none());
        assert!(envelope.into_session().is_none());
    }

    #[test]
    fn test_envelope_with_empty_token() {
        let envelope: PersistedSession = serde_json::from_str(
            r#"{"state":{"token":"","user":{"role":"ADMIN"}}}"#,
        )
        .unwrap();
        assert!(envelope.token().is_none());
        assert!(envelope.into_session().is_none());
    }
}
