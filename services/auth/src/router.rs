use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};
use tower_http::trace::TraceLayer;

use opal_core::health::healthz;
use opal_core::middleware::request_id_layer;

use crate::handlers::{
    login::begin_login,
    otp::{issue_otp, verify_otp},
    passcode::{set_passcode, verify_passcode},
    passkeys::{
        begin_assertion, begin_registration, complete_assertion, complete_registration,
        list_credentials, remove_credential,
    },
    session::{check_session, end_session},
};
use crate::state::AppState;

/// Readiness: the service is ready when its database answers.
async fn readyz(State(state): State<AppState>) -> StatusCode {
    match state.db.ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // One-time codes
        .route("/auth/otp/issue", post(issue_otp))
        .route("/auth/otp/verify", post(verify_otp))
        // Login orchestration
        .route("/auth/login/begin", post(begin_login))
        // Passcode
        .route("/auth/passcode", put(set_passcode))
        .route("/auth/passcode/verify", post(verify_passcode))
        // WebAuthn registration
        .route("/auth/webauthn/register", post(begin_registration))
        .route("/auth/webauthn/register", patch(complete_registration))
        // WebAuthn login
        .route("/auth/webauthn/challenge", post(begin_assertion))
        .route("/auth/webauthn/complete", post(complete_assertion))
        // Credential management
        .route("/auth/webauthn/credentials", get(list_credentials))
        .route(
            "/auth/webauthn/credentials/{credential_id}",
            delete(remove_credential),
        )
        // Session
        .route("/auth/session", get(check_session))
        .route("/auth/session", delete(end_session))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
