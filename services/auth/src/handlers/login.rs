use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AuthServiceError;
use crate::handlers::Client;
use crate::state::AppState;
use crate::usecase::flow::{BeginLoginInput, BeginLoginUseCase};

// ── POST /auth/login/begin ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct BeginLoginRequest {
    pub username: String,
}

#[derive(Serialize)]
pub struct BeginLoginResponse {
    /// Short-lived token the client presents to the credential step.
    pub continuation: String,
    /// Whether a passcode is enrolled; drives which credential UI to show.
    pub has_passcode: bool,
}

pub async fn begin_login(
    State(state): State<AppState>,
    Client(client): Client,
    Json(body): Json<BeginLoginRequest>,
) -> Result<Json<BeginLoginResponse>, AuthServiceError> {
    let usecase = BeginLoginUseCase {
        identities: state.identity_repo(),
        passcodes: state.passcode_repo(),
        audit: state.audit_repo(),
        limiter: state.rate_limiter(),
        session_secret: state.session_secret.clone(),
    };
    let out = usecase
        .execute(BeginLoginInput {
            username: body.username,
            client,
        })
        .await?;
    Ok(Json(BeginLoginResponse {
        continuation: out.continuation,
        has_passcode: out.has_passcode,
    }))
}
