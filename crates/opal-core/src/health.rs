use axum::http::StatusCode;

/// Handler for `GET /healthz` — liveness only. Readiness is service-specific
/// (the auth service pings its database) and lives with the service router.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
