use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use serde::Serialize;

use opal_auth_types::cookie::clear_session_cookie;

use crate::error::AuthServiceError;
use crate::handlers::require_session;
use crate::state::AppState;
use crate::usecase::session::SessionBundle;

/// Session view mirrored into JSON whenever a session is issued or checked.
/// The raw token stays in the cookie only.
#[derive(Serialize)]
pub struct SessionResponse {
    pub public_id: String,
    pub username: Option<String>,
    pub setup_complete: bool,
    pub verified: bool,
    pub expires_at: u64,
}

impl SessionResponse {
    pub fn from_bundle(bundle: &SessionBundle) -> Self {
        Self {
            public_id: bundle.identity.public_id.clone(),
            username: bundle.identity.username.clone(),
            setup_complete: bundle.identity.is_setup_complete,
            verified: bundle.identity.is_verified,
            expires_at: bundle.expires_at,
        }
    }
}

// ── GET /auth/session ─────────────────────────────────────────────────────────

pub async fn check_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<SessionResponse>, AuthServiceError> {
    let info = require_session(&jar, &state.session_secret)?;
    Ok(Json(SessionResponse {
        public_id: info.public_id,
        username: info.username,
        setup_complete: info.setup_complete,
        verified: info.verified,
        expires_at: info.expires_at,
    }))
}

// ── DELETE /auth/session ──────────────────────────────────────────────────────

pub async fn end_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthServiceError> {
    // Tokens are self-contained, so "logout" is clearing the cookie; the
    // token itself stays valid until expiry.
    let jar = clear_session_cookie(jar, state.cookie_domain.clone());
    Ok((StatusCode::NO_CONTENT, jar))
}
