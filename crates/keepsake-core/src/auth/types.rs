//! Persisted records and wire shapes for the authentication gate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KeepsakeError;
use crate::Result;

/// The hashed master passphrase and its rate-limit state, one per identity.
///
/// `failed_attempts` and `locked_until` are always written together as the
/// outcome of an authentication attempt; a reader never sees one updated
/// without the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassphraseRecord {
    /// PHC-format slow hash; carries its own salt and cost parameters.
    pub hashed_passphrase: String,

    /// When this record was created.
    pub created_at: DateTime<Utc>,

    /// Last successful authentication, if any.
    pub last_used: Option<DateTime<Utc>>,

    /// Optional plaintext reminder. Never the passphrase itself.
    pub recovery_hint: Option<String>,

    /// Consecutive failures since the last success.
    pub failed_attempts: u32,

    /// While in the future, authentication is refused outright. Checked
    /// live on each attempt; never cleared by the passage of time alone.
    pub locked_until: Option<DateTime<Utc>>,
}

/// An authorization grant issued on successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unguessable token: 32 random bytes, hex-encoded.
    pub id: String,

    /// Identity this session belongs to.
    pub user_id: String,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every successful validation.
    pub last_activity: DateTime<Utc>,

    /// Absolute expiry, fixed at creation and never extended.
    pub expires_at: DateTime<Utc>,

    /// Client address recorded at creation, if the host supplied one.
    pub ip_address: Option<String>,

    /// Client user agent recorded at creation, if the host supplied one.
    pub user_agent: Option<String>,
}

impl Session {
    /// Past the absolute TTL.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Untouched for longer than `idle_timeout`.
    pub fn is_idle_expired(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_activity > idle_timeout
    }
}

/// Optional client metadata recorded on the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Wire shape of an authentication attempt's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
}

impl AuthResponse {
    /// Flatten an `authenticate` result into the wire shape.
    pub fn from_result(result: &Result<Session>) -> Self {
        match result {
            Ok(session) => Self {
                success: true,
                session_id: Some(session.id.clone()),
                error: None,
                remaining_attempts: None,
                locked_until: None,
            },
            Err(err) => {
                let (remaining_attempts, locked_until) = match err {
                    KeepsakeError::IncorrectPassphrase {
                        remaining_attempts,
                        locked_until,
                    } => (Some(*remaining_attempts), *locked_until),
                    KeepsakeError::Locked { until } => (None, Some(*until)),
                    _ => (None, None),
                };
                Self {
                    success: false,
                    session_id: None,
                    error: Some(err.to_string()),
                    remaining_attempts,
                    locked_until,
                }
            }
        }
    }
}

/// Wire shape of a session validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionResponse {
    /// Flatten a `validate_session` result into the wire shape.
    pub fn from_result(result: &Result<Session>) -> Self {
        match result {
            Ok(session) => Self {
                valid: true,
                user_id: Some(session.user_id.clone()),
                error: None,
            },
            Err(err) => Self {
                valid: false,
                user_id: None,
                error: Some(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(now: DateTime<Utc>) -> Session {
        Session {
            id: "ab".repeat(32),
            user_id: "default".to_string(),
            created_at: now,
            last_activity: now,
            expires_at: now + Duration::hours(24),
            ip_address: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_session_expiry_boundaries() {
        let now = Utc::now();
        let session = session(now);

        assert!(!session.is_expired(now + Duration::hours(24)));
        assert!(session.is_expired(now + Duration::hours(24) + Duration::seconds(1)));

        assert!(!session.is_idle_expired(now + Duration::hours(2), Duration::hours(2)));
        assert!(session.is_idle_expired(
            now + Duration::hours(2) + Duration::minutes(1),
            Duration::hours(2)
        ));
    }

    #[test]
    fn test_auth_response_success_shape() {
        let now = Utc::now();
        let result: Result<Session> = Ok(session(now));
        let response = AuthResponse::from_result(&result);

        assert!(response.success);
        assert_eq!(response.session_id.as_deref(), Some("ab".repeat(32).as_str()));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("sessionId").is_some());
        assert!(json.get("remainingAttempts").is_none());
    }

    #[test]
    fn test_auth_response_failure_carries_detail() {
        let until = Utc::now() + Duration::minutes(30);
        let result: Result<Session> = Err(KeepsakeError::IncorrectPassphrase {
            remaining_attempts: 2,
            locked_until: Some(until),
        });
        let response = AuthResponse::from_result(&result);

        assert!(!response.success);
        assert_eq!(response.remaining_attempts, Some(2));
        assert_eq!(response.locked_until, Some(until));
        assert!(response.error.is_some());
    }

    #[test]
    fn test_session_response_invalid_shape() {
        let result: Result<Session> = Err(KeepsakeError::SessionIdleTimeout);
        let response = SessionResponse::from_result(&result);
        assert!(!response.valid);
        assert!(response.user_id.is_none());
        assert_eq!(response.error.as_deref(), Some("Session idle timeout"));
    }
}
