//! Session and auth state.
//!
//! One `AuthSession` per process behind a watch channel. The token being
//! present is what entitles a realtime channel to exist; the sync engine
//! observes the watch and reacts to identity changes.

use std::sync::Arc;

use tokio::sync::watch;

use skillswap_core::UserProfile;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSession {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
}

impl AuthSession {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The pair that scopes a realtime channel. Either component changing
    /// means the old channel must be torn down.
    pub fn identity(&self) -> Option<(i64, String)> {
        match (&self.user, &self.token) {
            (Some(user), Some(token)) => Some((user.id, token.clone())),
            _ => None,
        }
    }

    pub fn tokens(&self) -> Option<i64> {
        self.user.as_ref().map(|user| user.tokens)
    }
}

/// Shared handle to the session watch. Cloning shares the same state.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<AuthSession>>,
}

impl SessionHandle {
    /// Starts anonymous.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AuthSession::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn login(&self, user: UserProfile, token: impl Into<String>) {
        let _ = self.tx.send(AuthSession {
            user: Some(user),
            token: Some(token.into()),
        });
    }

    /// Clears user and token in one step.
    pub fn logout(&self) {
        let _ = self.tx.send(AuthSession::default());
    }

    pub fn update_user(&self, user: UserProfile) {
        self.tx.send_modify(|session| session.user = Some(user));
    }

    /// Patch just the balance on the current user; no-op when anonymous.
    pub fn patch_tokens(&self, tokens: i64) {
        self.tx.send_if_modified(|session| match &mut session.user {
            Some(user) if user.tokens != tokens => {
                user.tokens = tokens;
                true
            }
            _ => false,
        });
    }

    pub fn current(&self) -> AuthSession {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSession> {
        self.tx.subscribe()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}
