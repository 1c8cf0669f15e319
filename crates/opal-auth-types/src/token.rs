//! Session JWT validation.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test))]
use serde::Serialize;
use uuid::Uuid;

/// Authenticated identity extracted from a validated session token.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub identity_id: Uuid,
    /// Opaque public ID ("OS-ID") as shown to the user.
    pub public_id: String,
    pub username: Option<String>,
    pub setup_complete: bool,
    pub verified: bool,
    pub expires_at: u64,
}

/// Errors returned by [`validate_session_token`].
#[derive(Debug, thiserror::Error)]
pub enum SessionTokenError {
    #[error("invalid signature")]
    SignatureInvalid,
    #[error("session expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// Claims payload shared by session creation (auth service) and validation
/// (every other consumer).
///
/// | Field | JWT claim | Meaning |
/// |-------|-----------|---------|
/// | `sub` | `sub` | identity UUID |
/// | `oid` | custom | opaque public ID ("OS-ID") |
/// | `uname` | custom | username, absent until the user picks one |
/// | `setup` | custom | setup-completion flag |
/// | `vrf` | custom | verification flag |
/// | `iat` | `iat` | issued-at, seconds since epoch |
/// | `exp` | `exp` | expiry, seconds since epoch |
///
/// [`Serialize`] requires the **`USE_ONLY_IN_AUTH_SERVICE`** cargo feature.
/// Only the auth service enables it because it is the sole token issuer.
#[derive(Debug, Deserialize)]
#[cfg_attr(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test), derive(Serialize))]
pub struct SessionClaims {
    pub sub: String,
    pub oid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uname: Option<String>,
    pub setup: bool,
    pub vrf: bool,
    pub iat: u64,
    pub exp: u64,
}

/// Validate a session cookie value, returning the parsed identity.
///
/// Validation: HS256, exp checked, required claims `exp` + `sub`, default
/// 60s leeway for clock skew. A tampered token fails with
/// [`SessionTokenError::SignatureInvalid`] regardless of its claims.
pub fn validate_session_token(
    token: &str,
    secret: &str,
) -> Result<SessionInfo, SessionTokenError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionTokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => SessionTokenError::SignatureInvalid,
        _ => SessionTokenError::Malformed,
    })?;

    let claims = data.claims;
    let identity_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| SessionTokenError::Malformed)?;
    Ok(SessionInfo {
        identity_id,
        public_id: claims.oid,
        username: claims.uname,
        setup_complete: claims.setup,
        verified: claims.vrf,
        expires_at: claims.exp,
    })
}
