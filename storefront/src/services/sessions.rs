// storefront/src/services/sessions.rs

//! Opaque bearer tokens for signed-in users.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand_core::{OsRng, RngCore};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
  pub user_id: Uuid,
  /// Cart session bound at sign-in, if the client sent one.
  pub cart_session_id: Option<Uuid>,
  pub expires_at: DateTime<Utc>,
}

pub struct AuthSessions {
  ttl: Duration,
  sessions: RwLock<HashMap<String, AuthSession>>,
}

impl AuthSessions {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      sessions: RwLock::new(HashMap::new()),
    }
  }

  /// Creates a session and returns its token.
  pub fn issue(&self, user_id: Uuid, cart_session_id: Option<Uuid>) -> (String, AuthSession) {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let token: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    let session = AuthSession {
      user_id,
      cart_session_id,
      expires_at: Utc::now() + self.ttl,
    };
    self.sessions.write().insert(token.clone(), session.clone());
    debug!(%user_id, "Auth session issued.");
    (token, session)
  }

  /// Looks up a live session. Expired sessions are dropped on access.
  pub fn validate(&self, token: &str) -> Option<AuthSession> {
    let session = self.sessions.read().get(token).cloned()?;
    if session.expires_at <= Utc::now() {
      self.sessions.write().remove(token);
      return None;
    }
    Some(session)
  }

  pub fn revoke(&self, token: &str) -> Option<AuthSession> {
    self.sessions.write().remove(token)
  }

  pub fn purge_expired(&self) -> usize {
    let now = Utc::now();
    let mut sessions = self.sessions.write();
    let before = sessions.len();
    sessions.retain(|_, s| s.expires_at > now);
    before - sessions.len()
  }

  pub fn len(&self) -> usize {
    self.sessions.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.read().is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn issued_tokens_validate_until_revoked() {
    let sessions = AuthSessions::new(Duration::hours(1));
    let user_id = Uuid::new_v4();
    let (token, _) = sessions.issue(user_id, None);

    assert_eq!(token.len(), 64);
    assert_eq!(sessions.validate(&token).map(|s| s.user_id), Some(user_id));
    assert!(sessions.revoke(&token).is_some());
    assert!(sessions.validate(&token).is_none());
  }

  #[test]
  fn expired_sessions_are_rejected_and_purged() {
    let sessions = AuthSessions::new(Duration::seconds(-1));
    let (token, _) = sessions.issue(Uuid::new_v4(), None);
    let (_other, _) = sessions.issue(Uuid::new_v4(), None);

    assert!(sessions.validate(&token).is_none());
    assert_eq!(sessions.purge_expired(), 1);
    assert!(sessions.is_empty());
  }
}
