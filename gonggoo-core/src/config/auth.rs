//! Session token verification settings.

/// Key used to verify the HMAC on caller session tokens.
#[derive(Clone)]
pub struct AuthConfig {
    session_secret: Box<[u8]>,
}

impl AuthConfig {
    pub fn new(session_secret: impl Into<Box<[u8]>>) -> Self {
        Self {
            session_secret: session_secret.into(),
        }
    }

    pub fn session_secret(&self) -> &[u8] {
        &self.session_secret
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_secret", &"<redacted>")
            .finish()
    }
}
