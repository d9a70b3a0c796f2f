//! Bearer credential storage

use std::sync::{Arc, RwLock};

/// Shared bearer token attached to authenticated live calls.
///
/// Cleared on a 401 response; the action log and local cache are never
/// cleared with it, so unsynced work survives a forced logout/login cycle.
#[derive(Clone, Default)]
pub struct SessionStore {
    token: Arc<RwLock<Option<String>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_token(token);
        store
    }

    /// Current credential, if any
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    /// Replace the credential (e.g. after login)
    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    /// Drop the credential (e.g. after a 401)
    pub fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SessionStore")
            .field(
                "token",
                &self.token().map(|_| "[REDACTED]").unwrap_or("<none>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lifecycle() {
        let session = SessionStore::new();
        assert!(session.token().is_none());

        session.set_token("abc123");
        assert_eq!(session.token().as_deref(), Some("abc123"));

        session.clear();
        assert!(session.token().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let session = SessionStore::with_token("secret");
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
