//! Session-cookie verification.
//!
//! The OAuth front end sets a `discord_user` cookie once the provider callback succeeds. Its value
//! is `<payload>.<signature>` where
//!
//! - `payload` is the URL-safe, unpadded base64 of the principal JSON
//!   (`{"id": "...", "username": "...", "avatar": "..."}`), and
//! - `signature` is the lowercase hex HMAC-SHA256 of `payload` under the session secret.
//!
//! A cookie that is missing, malformed or badly signed yields no principal; the storage core then
//! answers `Unauthenticated`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use koderstore_core::Principal;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie carrying the session principal.
pub const SESSION_COOKIE_NAME: &str = "discord_user";

/// Shortest accepted session secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("session cookie is malformed")]
    Malformed,
    #[error("session cookie signature does not match")]
    BadSignature,
    #[error("session payload is invalid: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Signs and verifies session cookies with a shared secret.
#[derive(Clone)]
pub struct SessionVerifier {
    mac: HmacSha256,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier").finish_non_exhaustive()
    }
}

impl SessionVerifier {
    /// # Errors
    ///
    /// Returns `SessionError::WeakSecret` if the secret is shorter than [`MIN_SECRET_LEN`].
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SessionError> {
        let key = secret.as_ref();
        if key.len() < MIN_SECRET_LEN {
            return Err(SessionError::WeakSecret);
        }
        let mac = <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| SessionError::WeakSecret)?;
        Ok(Self { mac })
    }

    /// Produces the cookie value for a principal.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPayload` if the principal cannot be serialised.
    pub fn sign(&self, principal: &Principal) -> Result<String, SessionError> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(principal)?);
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Verifies a cookie value and returns the principal it carries.
    ///
    /// # Errors
    ///
    /// - `SessionError::Malformed` if the value is not `<payload>.<hex signature>` or the payload
    ///   is not base64.
    /// - `SessionError::BadSignature` if the signature does not match.
    /// - `SessionError::InvalidPayload` if the payload is not a valid principal.
    pub fn verify(&self, value: &str) -> Result<Principal, SessionError> {
        let (payload, signature) = value.trim().rsplit_once('.').ok_or(SessionError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| SessionError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::Malformed)?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Extracts and verifies the session principal from a `Cookie` header value.
    ///
    /// Returns `None` when the cookie is absent or fails verification; failures are logged.
    pub fn principal_from_cookie_header(&self, header: &str) -> Option<Principal> {
        let value = header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE_NAME)
            .map(|(_, value)| value)?;

        match self.verify(value) {
            Ok(principal) => Some(principal),
            Err(e) => {
                tracing::warn!(error = %e, "rejecting session cookie");
                None
            }
        }
    }
}
