pub mod login;
pub mod otp;
pub mod passcode;
pub mod passkeys;
pub mod session;

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use opal_auth_types::cookie::OPAL_SESSION;
use opal_auth_types::token::{SessionInfo, SessionTokenError, validate_session_token};

use crate::domain::audit::ClientMeta;
use crate::error::AuthServiceError;

/// Client request metadata (source IP and user agent) for audit records.
///
/// The service sits behind a reverse proxy, so the peer address is the
/// proxy's; `x-forwarded-for` (first hop) then `x-real-ip` are trusted
/// instead. Never fails — an unattributable request audits as "unknown".
#[derive(Debug, Clone)]
pub struct Client(pub ClientMeta);

impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    // axum-core 0.5 defines this as `fn -> impl Future + Send` (not `async fn`).
    // In Rust 1.82+ precise capturing, `async fn` captures lifetimes differently,
    // causing E0195. Fix: extract values synchronously, return a 'static async move block.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_owned());
        let real_ip = parts
            .headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_owned());
        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_owned());

        async move {
            let ip = forwarded
                .or(real_ip)
                .unwrap_or_else(|| "unknown".to_owned());
            Ok(Self(ClientMeta {
                ip,
                user_agent: user_agent.unwrap_or_default(),
            }))
        }
    }
}

/// Validate the session cookie, returning the authenticated identity.
pub fn require_session(jar: &CookieJar, secret: &str) -> Result<SessionInfo, AuthServiceError> {
    let token = jar
        .get(OPAL_SESSION)
        .map(|c| c.value().to_owned())
        .ok_or(AuthServiceError::InvalidCredential)?;
    validate_session_token(&token, secret).map_err(|e| match e {
        SessionTokenError::Expired => AuthServiceError::Expired,
        SessionTokenError::SignatureInvalid => AuthServiceError::SignatureInvalid,
        SessionTokenError::Malformed => AuthServiceError::Malformed,
    })
}
