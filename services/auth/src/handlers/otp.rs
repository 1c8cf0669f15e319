use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use opal_auth_types::cookie::set_session_cookie;

use crate::domain::types::Purpose;
use crate::error::AuthServiceError;
use crate::handlers::Client;
use crate::handlers::session::SessionResponse;
use crate::state::AppState;
use crate::usecase::flow::{VerifyOtpInput, VerifyOtpUseCase};
use crate::usecase::otp::{IssueOtpInput, IssueOtpUseCase};

// ── POST /auth/otp/issue ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IssueOtpRequest {
    pub identifier: String,
    pub purpose: Purpose,
}

#[derive(Serialize)]
pub struct IssueOtpResponse {
    pub expires_in_secs: i64,
    pub delivered: bool,
}

pub async fn issue_otp(
    State(state): State<AppState>,
    Client(client): Client,
    Json(body): Json<IssueOtpRequest>,
) -> Result<Json<IssueOtpResponse>, AuthServiceError> {
    let usecase = IssueOtpUseCase {
        identities: state.identity_repo(),
        codes: state.otp_repo(),
        audit: state.audit_repo(),
        limiter: state.rate_limiter(),
        messenger: state.messenger.clone(),
    };
    let out = usecase
        .execute(IssueOtpInput {
            identifier: body.identifier,
            purpose: body.purpose,
            client,
        })
        .await?;
    Ok(Json(IssueOtpResponse {
        expires_in_secs: out.expires_in_secs,
        delivered: out.delivered,
    }))
}

// ── POST /auth/otp/verify ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub identifier: String,
    pub purpose: Purpose,
    pub code: String,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    Client(client): Client,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = VerifyOtpUseCase {
        identities: state.identity_repo(),
        codes: state.otp_repo(),
        audit: state.audit_repo(),
        limiter: state.rate_limiter(),
        session_secret: state.session_secret.clone(),
    };
    let bundle = usecase
        .execute(VerifyOtpInput {
            identifier: body.identifier,
            purpose: body.purpose,
            code: body.code,
            client,
        })
        .await?;

    let response = SessionResponse::from_bundle(&bundle);
    let jar = set_session_cookie(jar, bundle.token, state.cookie_domain.clone());
    Ok((StatusCode::CREATED, jar, Json(response)))
}
