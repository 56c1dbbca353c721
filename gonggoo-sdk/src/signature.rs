//! Session tokens for the callable API.
//!
//! The app's auth service mints a token for a signed-in user with a secret
//! shared with this backend. The wire format is:
//!
//! ```text
//! Authorization: Bearer {user_id}.{expires_at}.{base64_signature}
//! ```
//!
//! where the signature is `HMAC-SHA256("{user_id}.{expires_at}", secret)`
//! and `expires_at` is a unix timestamp. The user id may itself contain dots;
//! the token is split from the right.

/// Header carrying the session token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Scheme prefix of the authorization header value.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Errors produced by session-token operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// The authenticated content of a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: String,
    pub expires_at: i64,
}

fn mac_input(user_id: &str, expires_at: i64) -> String {
    format!("{user_id}.{expires_at}")
}

/// Sign a session token that expires at the given unix timestamp.
pub fn sign_session_token(user_id: &str, expires_at: i64, key: &[u8]) -> String {
    let data = mac_input(user_id, expires_at);
    let sig = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
    );
    format!(
        "{}.{}",
        data,
        fast32::base64::RFC4648_NOPAD.encode(sig.as_ref())
    )
}

/// Sign a session token valid for `ttl` from now.
pub fn issue_session_token(user_id: &str, ttl: time::Duration, key: &[u8]) -> String {
    let expires_at = (time::OffsetDateTime::now_utc() + ttl).unix_timestamp();
    sign_session_token(user_id, expires_at, key)
}

/// Parse a token into `(user_id, expires_at, signature_bytes)` without
/// verifying it.
pub fn parse_session_token(token: &str) -> Result<(&str, i64, Box<[u8]>), SignatureError> {
    let mut parts = token.rsplitn(3, '.');
    let signature = parts.next().ok_or(SignatureError::InvalidFormat)?;
    let expires_at = parts.next().ok_or(SignatureError::InvalidFormat)?;
    let user_id = parts.next().ok_or(SignatureError::InvalidFormat)?;
    if user_id.is_empty() {
        return Err(SignatureError::InvalidFormat);
    }
    let expires_at: i64 = expires_at
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature = fast32::base64::RFC4648_NOPAD
        .decode_str(signature)
        .map_err(|_| SignatureError::InvalidBase64)?
        .into_boxed_slice();
    Ok((user_id, expires_at, signature))
}

/// Verify a session token's MAC and expiry.
pub fn verify_session_token(token: &str, key: &[u8]) -> Result<SessionClaims, SignatureError> {
    let (user_id, expires_at, signature) = parse_session_token(token)?;
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        mac_input(user_id, expires_at).as_bytes(),
        &signature,
    )?;
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if now >= expires_at {
        return Err(SignatureError::Expired);
    }
    Ok(SessionClaims {
        user_id: user_id.to_owned(),
        expires_at,
    })
}

/// Extract the token from an `Authorization` header value.
pub fn strip_bearer(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
