//! Shared session-token handle.
//!
//! The host app's auth layer owns the token lifecycle: login writes it,
//! logout clears it. The cart engine only reads the token to decide whether
//! an operation is mirrored to the server; without one the cart runs in
//! guest mode and never touches the network.

use core::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use secrecy::SecretString;

/// Cheap-to-clone handle to the current session token.
///
/// All clones share the same slot, so a token installed by the auth layer is
/// immediately visible to every component holding the handle.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone, Default)]
pub struct SessionProvider {
    token: Arc<RwLock<Option<SecretString>>>,
}

impl SessionProvider {
    /// Create a provider with no active session (guest mode).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider that already holds a token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let provider = Self::new();
        provider.set_token(token);
        provider
    }

    /// Install a session token after login.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(SecretString::from(token.into()));
    }

    /// Drop the session token on logout.
    pub fn clear(&self) {
        *self.token.write() = None;
    }

    /// The current session token, if any.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.token.read().clone()
    }

    /// Whether a session token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}

impl fmt::Debug for SessionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionProvider")
            .field("token", &self.token.read().as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
