//! Remote session port
//!
//! `DualStore` never looks up a shared client: it is handed a
//! [`RemoteConnector`] at construction and asks it exactly once for a
//! verified [`RemoteStore`]. If that fails the store degrades to local-only
//! for its whole lifetime.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::remote_store::{RemoteError, RemoteStore};

/// OAuth tokens issued by the cloud provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for obtaining a new access token without user interaction
    pub refresh_token: Option<String>,
    /// When the access token expires (`None` for long-lived tokens)
    pub expires_at: Option<DateTime<Utc>>,
}

impl Tokens {
    /// Wraps a long-lived access token with no refresh token
    pub fn long_lived(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() + duration >= at)
    }
}

/// Produces a live remote session
///
/// Implementations may prompt the user, refresh tokens or retry; by the
/// time `connect` returns `Ok`, the store has been verified.
pub trait RemoteConnector {
    fn connect(&self) -> Result<Arc<dyn RemoteStore>, RemoteError>;
}

/// An already-built store connects by verifying itself.
impl<R: RemoteStore + 'static> RemoteConnector for Arc<R> {
    fn connect(&self) -> Result<Arc<dyn RemoteStore>, RemoteError> {
        self.verify()?;
        let store: Arc<dyn RemoteStore> = self.clone();
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_lived_tokens_never_expire() {
        let tokens = Tokens::long_lived("sl.abc");
        assert!(!tokens.is_expired());
        assert!(!tokens.expires_within(chrono::Duration::days(365)));
    }

    #[test]
    fn test_expired_tokens() {
        let tokens = Tokens {
            access_token: "sl.abc".into(),
            refresh_token: Some("refresh".into()),
            expires_at: Some(Utc::now() - chrono::Duration::minutes(1)),
        };
        assert!(tokens.is_expired());
    }

    #[test]
    fn test_expires_within_window() {
        let tokens = Tokens {
            access_token: "sl.abc".into(),
            refresh_token: None,
            expires_at: Some(Utc::now() + chrono::Duration::minutes(2)),
        };
        assert!(!tokens.is_expired());
        assert!(tokens.expires_within(chrono::Duration::minutes(5)));
    }

    #[test]
    fn test_tokens_json_roundtrip_without_expiry() {
        let json = r#"{"access_token":"sl.abc","refresh_token":null,"expires_at":null}"#;
        let tokens: Tokens = serde_json::from_str(json).unwrap();
        assert_eq!(tokens, Tokens::long_lived("sl.abc"));
    }
}
