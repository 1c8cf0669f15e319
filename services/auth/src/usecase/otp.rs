//! One-time-code issuance.
//!
//! Codes are persisted before delivery is attempted, so a delivery failure
//! can never leave an unverifiable code. Delivery failure is degraded
//! service, not an error: the response carries `delivered: false` and the
//! caller shows a fallback channel.

use chrono::{Duration, Utc};
use rand::RngExt;

use crate::domain::audit::{
    ClientMeta, EventDetail, EventKind, LoginMethod, RiskLevel, SecurityEvent,
};
use crate::domain::repository::{
    AuditRepository, IdentityRepository, MessagePort, OtpRepository, RateLimiter,
};
use crate::domain::types::{
    OTP_TTL_SECS, OneTimeCode, Purpose, RATE_LIMIT_MAX_ATTEMPTS, RATE_LIMIT_WINDOW_SECS,
};
use crate::error::AuthServiceError;

/// Uniform 6-digit code, 100000–999999.
fn generate_code() -> String {
    let mut rng = rand::rng();
    rng.random_range(100_000..=999_999).to_string()
}

pub struct IssueOtpInput {
    pub identifier: String,
    pub purpose: Purpose,
    pub client: ClientMeta,
}

#[derive(Debug)]
pub struct IssueOtpOutput {
    pub expires_in_secs: i64,
    /// False when the Telegram send failed — the code is still valid.
    pub delivered: bool,
}

pub struct IssueOtpUseCase<I, O, A, R, M>
where
    I: IdentityRepository,
    O: OtpRepository,
    A: AuditRepository,
    R: RateLimiter,
    M: MessagePort,
{
    pub identities: I,
    pub codes: O,
    pub audit: A,
    pub limiter: R,
    pub messenger: M,
}

impl<I, O, A, R, M> IssueOtpUseCase<I, O, A, R, M>
where
    I: IdentityRepository,
    O: OtpRepository,
    A: AuditRepository,
    R: RateLimiter,
    M: MessagePort,
{
    pub async fn execute(&self, input: IssueOtpInput) -> Result<IssueOtpOutput, AuthServiceError> {
        let key = format!("otp_issue:{}", input.client.ip);
        let decision = self
            .limiter
            .allow(&key, RATE_LIMIT_MAX_ATTEMPTS, RATE_LIMIT_WINDOW_SECS)
            .await?;
        if !decision.allowed {
            self.audit
                .append(&SecurityEvent::new(
                    EventKind::RateLimitExceeded,
                    RiskLevel::High,
                    "otp issuance rate limit exceeded",
                    None,
                    EventDetail::RateLimit {
                        scope: "otp_issue".to_owned(),
                        key: input.client.ip.clone(),
                    },
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::RateLimited);
        }

        // LOGIN codes require an existing identity; nothing must be written
        // that looks issued when the handle is unknown.
        let identity = self.identities.find_by_handle(&input.identifier).await?;
        if input.purpose == Purpose::Login && identity.is_none() {
            self.audit
                .append(&SecurityEvent::new(
                    EventKind::LoginFailed,
                    RiskLevel::Medium,
                    "login code requested for unknown handle",
                    None,
                    EventDetail::Login {
                        method: LoginMethod::Otp,
                        identifier: Some(input.identifier.clone()),
                    },
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::SignupRequired);
        }

        let now = Utc::now();
        let code = OneTimeCode {
            identifier: input.identifier.clone(),
            purpose: input.purpose,
            code: generate_code(),
            expires_at: now + Duration::seconds(OTP_TTL_SECS),
            attempts: 0,
            consumed: false,
            identity_id: identity.as_ref().map(|i| i.id),
            created_at: now,
        };

        // Persist first — a re-issue atomically invalidates any prior code
        // for this (identifier, purpose) and zeroes the attempt counter.
        self.codes.put_reset(&code).await?;

        let message = format!(
            "Your verification code is {}. It expires in {} minutes.",
            code.code,
            OTP_TTL_SECS / 60
        );
        let delivered = match self.messenger.send(&input.identifier, &message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(identifier = %input.identifier, error = %e, "code delivery failed");
                // Test/dev fallback only: surface the code on the console so
                // flows stay usable without a bot token. Compiled out of
                // release builds.
                #[cfg(debug_assertions)]
                tracing::debug!(code = %code.code, "undelivered code (debug builds only)");
                false
            }
        };

        self.audit
            .append(&SecurityEvent::new(
                EventKind::OtpIssued,
                RiskLevel::Low,
                "one-time code issued",
                code.identity_id,
                EventDetail::Otp {
                    identifier: input.identifier,
                    purpose: input.purpose,
                    delivered: Some(delivered),
                },
                &input.client,
            ))
            .await?;

        Ok(IssueOtpOutput {
            expires_in_secs: OTP_TTL_SECS,
            delivered,
        })
    }
}
