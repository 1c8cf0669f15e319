use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webauthn_rs::prelude::{PublicKeyCredential, RegisterPublicKeyCredential};

use opal_auth_types::cookie::set_session_cookie;

use crate::domain::types::DeviceClass;
use crate::error::AuthServiceError;
use crate::handlers::session::SessionResponse;
use crate::handlers::{Client, require_session};
use crate::state::AppState;
use crate::usecase::passkey::{
    BeginAssertionUseCase, BeginRegistrationUseCase, CompleteAssertionInput,
    CompleteAssertionUseCase, CompleteRegistrationInput, CompleteRegistrationUseCase,
    ListCredentialsUseCase, RemoveCredentialUseCase,
};

const X_OPAL_CEREMONY_ID: &str = "x-opal-ceremony-id";

fn ceremony_header(ceremony_id: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(X_OPAL_CEREMONY_ID),
        HeaderValue::from_str(ceremony_id).unwrap(),
    )
}

// ── GET /auth/webauthn/credentials ────────────────────────────────────────────

#[derive(Serialize)]
pub struct CredentialResponse {
    pub credential_id: String,
    pub device_name: String,
    pub device_class: DeviceClass,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

pub async fn list_credentials(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<CredentialResponse>>, AuthServiceError> {
    let info = require_session(&jar, &state.session_secret)?;

    let usecase = ListCredentialsUseCase {
        biometrics: state.biometric_repo(),
    };
    let list = usecase.execute(info.identity_id).await?;
    let body: Vec<CredentialResponse> = list
        .into_iter()
        .map(|cred| CredentialResponse {
            credential_id: URL_SAFE_NO_PAD.encode(&cred.credential_id),
            device_name: cred.device_name,
            device_class: cred.device_class,
            created_at: cred.created_at,
            last_used_at: cred.last_used_at,
        })
        .collect();
    Ok(Json(body))
}

// ── DELETE /auth/webauthn/credentials/{credential_id} ─────────────────────────

pub async fn remove_credential(
    State(state): State<AppState>,
    jar: CookieJar,
    Client(client): Client,
    Path(credential_id_b64): Path<String>,
) -> Result<StatusCode, AuthServiceError> {
    let info = require_session(&jar, &state.session_secret)?;

    let credential_id = URL_SAFE_NO_PAD
        .decode(&credential_id_b64)
        .map_err(|_| AuthServiceError::Malformed)?;

    let usecase = RemoveCredentialUseCase {
        biometrics: state.biometric_repo(),
        audit: state.audit_repo(),
    };
    usecase
        .execute(&credential_id, info.identity_id, &client)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /auth/webauthn/register ──────────────────────────────────────────────

pub async fn begin_registration(
    State(state): State<AppState>,
    jar: CookieJar,
    Client(client): Client,
) -> Result<impl IntoResponse, AuthServiceError> {
    let info = require_session(&jar, &state.session_secret)?;

    let usecase = BeginRegistrationUseCase {
        identities: state.identity_repo(),
        biometrics: state.biometric_repo(),
        cache: state.challenge_cache(),
        audit: state.audit_repo(),
        webauthn: state.webauthn.clone(),
    };
    let out = usecase.execute(info.identity_id, &client).await?;

    let mut headers = HeaderMap::new();
    let (name, value) = ceremony_header(&out.ceremony_id);
    headers.insert(name, value);

    Ok((StatusCode::OK, headers, Json(out.challenge)))
}

// ── PATCH /auth/webauthn/register?ceremony-id={id} ────────────────────────────

#[derive(Deserialize)]
pub struct CompleteRegistrationQuery {
    #[serde(rename = "ceremony-id")]
    pub ceremony_id: String,
}

#[derive(Deserialize)]
pub struct CompleteRegistrationRequest {
    pub credential: RegisterPublicKeyCredential,
    pub device_name: String,
    pub device_class: DeviceClass,
}

pub async fn complete_registration(
    State(state): State<AppState>,
    jar: CookieJar,
    Client(client): Client,
    Query(query): Query<CompleteRegistrationQuery>,
    Json(body): Json<CompleteRegistrationRequest>,
) -> Result<StatusCode, AuthServiceError> {
    let info = require_session(&jar, &state.session_secret)?;

    let usecase = CompleteRegistrationUseCase {
        biometrics: state.biometric_repo(),
        cache: state.challenge_cache(),
        audit: state.audit_repo(),
        webauthn: state.webauthn.clone(),
    };
    usecase
        .execute(CompleteRegistrationInput {
            identity_id: info.identity_id,
            ceremony_id: query.ceremony_id,
            credential: body.credential,
            device_name: body.device_name,
            device_class: body.device_class,
            client,
        })
        .await?;
    Ok(StatusCode::CREATED)
}

// ── POST /auth/webauthn/challenge ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChallengeRequest {
    pub continuation: String,
}

pub async fn begin_assertion(
    State(state): State<AppState>,
    Client(client): Client,
    Json(body): Json<ChallengeRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = BeginAssertionUseCase {
        identities: state.identity_repo(),
        biometrics: state.biometric_repo(),
        cache: state.challenge_cache(),
        audit: state.audit_repo(),
        webauthn: state.webauthn.clone(),
        session_secret: state.session_secret.clone(),
    };
    let out = usecase.execute(&body.continuation, &client).await?;

    let mut headers = HeaderMap::new();
    let (name, value) = ceremony_header(&out.ceremony_id);
    headers.insert(name, value);

    Ok((StatusCode::OK, headers, Json(out.challenge)))
}

// ── POST /auth/webauthn/complete ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CompleteAssertionRequest {
    pub continuation: String,
    pub ceremony_id: String,
    pub credential: PublicKeyCredential,
}

pub async fn complete_assertion(
    State(state): State<AppState>,
    jar: CookieJar,
    Client(client): Client,
    Json(body): Json<CompleteAssertionRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = CompleteAssertionUseCase {
        identities: state.identity_repo(),
        biometrics: state.biometric_repo(),
        cache: state.challenge_cache(),
        audit: state.audit_repo(),
        webauthn: state.webauthn.clone(),
        session_secret: state.session_secret.clone(),
    };
    let bundle = usecase
        .execute(CompleteAssertionInput {
            continuation: body.continuation,
            ceremony_id: body.ceremony_id,
            credential: body.credential,
            client,
        })
        .await?;

    let response = SessionResponse::from_bundle(&bundle);
    let jar = set_session_cookie(jar, bundle.token, state.cookie_domain.clone());
    Ok((StatusCode::CREATED, jar, Json(response)))
}
