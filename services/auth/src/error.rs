use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Auth service error taxonomy. Each variant maps to a stable `kind` code in
/// the JSON response body so clients never have to parse human strings.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("not found")]
    NotFound,
    #[error("code or challenge expired")]
    Expired,
    #[error("attempt limit reached")]
    Exhausted,
    #[error("invalid credential")]
    InvalidCredential,
    #[error("credential already registered")]
    AlreadyExists,
    #[error("credential limit reached")]
    QuotaExceeded,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("signup required")]
    SignupRequired,
    #[error("delivery channel unavailable")]
    UpstreamUnavailable,
    #[error("invalid signature")]
    SignatureInvalid,
    #[error("malformed token")]
    Malformed,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Expired => "EXPIRED",
            Self::Exhausted => "EXHAUSTED",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::RateLimited => "RATE_LIMITED",
            Self::SignupRequired => "SIGNUP_REQUIRED",
            Self::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::Malformed => "MALFORMED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound | Self::SignupRequired => StatusCode::NOT_FOUND,
            Self::Expired
            | Self::InvalidCredential
            | Self::SignatureInvalid
            | Self::Malformed => StatusCode::UNAUTHORIZED,
            Self::Exhausted | Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::AlreadyExists | Self::QuotaExceeded => StatusCode::CONFLICT,
            Self::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Log 500s only — tower-http TraceLayer already records method/uri/status for all
        // requests. 4xx are expected client errors; logging them here would be noise.
        // Internal errors need the anyhow chain logged so the root cause is traceable.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "success": false,
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
