//! Session issuance. Sessions are self-contained signed tokens — there is no
//! server-side session row, so revocation before expiry is only possible by
//! rotating the signing secret.

use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::{SystemTime, UNIX_EPOCH};

use opal_auth_types::cookie::SESSION_EXP;
use opal_auth_types::token::SessionClaims;

use crate::domain::types::Identity;
use crate::error::AuthServiceError;

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}

/// A freshly minted session for a verified identity.
#[derive(Debug)]
pub struct SessionBundle {
    pub identity: Identity,
    pub token: String,
    pub expires_at: u64,
}

/// Sign a 7-day session token embedding the identity's claims.
pub fn issue_session(identity: &Identity, secret: &str) -> Result<(String, u64), AuthServiceError> {
    let iat = now_secs();
    let exp = iat + SESSION_EXP;
    let claims = SessionClaims {
        sub: identity.id.to_string(),
        oid: identity.public_id.clone(),
        uname: identity.username.clone(),
        setup: identity.is_setup_complete,
        vrf: identity.is_verified,
        iat,
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthServiceError::Internal(e.into()))?;
    Ok((token, exp))
}

pub fn session_bundle(identity: Identity, secret: &str) -> Result<SessionBundle, AuthServiceError> {
    let (token, expires_at) = issue_session(&identity, secret)?;
    Ok(SessionBundle {
        identity,
        token,
        expires_at,
    })
}
