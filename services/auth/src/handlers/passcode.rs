use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use opal_auth_types::cookie::set_session_cookie;

use crate::error::AuthServiceError;
use crate::handlers::session::SessionResponse;
use crate::handlers::{Client, require_session};
use crate::state::AppState;
use crate::usecase::passcode::{SetPasscodeUseCase, VerifyPasscodeInput, VerifyPasscodeUseCase};

// ── PUT /auth/passcode ────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SetPasscodeRequest {
    pub passcode: String,
}

pub async fn set_passcode(
    State(state): State<AppState>,
    jar: CookieJar,
    Client(client): Client,
    Json(body): Json<SetPasscodeRequest>,
) -> Result<StatusCode, AuthServiceError> {
    let info = require_session(&jar, &state.session_secret)?;

    let usecase = SetPasscodeUseCase {
        identities: state.identity_repo(),
        passcodes: state.passcode_repo(),
        audit: state.audit_repo(),
    };
    usecase
        .execute(info.identity_id, &body.passcode, &client)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /auth/passcode/verify ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyPasscodeRequest {
    pub continuation: String,
    pub passcode: String,
}

pub async fn verify_passcode(
    State(state): State<AppState>,
    jar: CookieJar,
    Client(client): Client,
    Json(body): Json<VerifyPasscodeRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = VerifyPasscodeUseCase {
        identities: state.identity_repo(),
        passcodes: state.passcode_repo(),
        audit: state.audit_repo(),
        limiter: state.rate_limiter(),
        session_secret: state.session_secret.clone(),
    };
    let bundle = usecase
        .execute(VerifyPasscodeInput {
            continuation: body.continuation,
            passcode: body.passcode,
            client,
        })
        .await?;

    let response = SessionResponse::from_bundle(&bundle);
    let jar = set_session_cookie(jar, bundle.token, state.cookie_domain.clone());
    Ok((StatusCode::CREATED, jar, Json(response)))
}
