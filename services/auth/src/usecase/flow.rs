//! Login/signup orchestration.
//!
//! Flow state machine: Start → IdentifierKnown → CodeOrCredentialPending →
//! Verified → SessionIssued, with Failed reachable from any state. Each
//! transition appends exactly one security event, whichever path was taken.
//!
//! Step-to-step identity is carried by server-issued continuation tokens
//! (short-lived signed JWTs), never by client-side hints: the passcode and
//! biometric login paths both begin with `BeginLoginUseCase` resolving a
//! username into a continuation token.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::audit::{
    ClientMeta, EventDetail, EventKind, LoginMethod, RiskLevel, SecurityEvent,
};
use crate::domain::repository::{
    AuditRepository, IdentityRepository, OtpRepository, PasscodeRepository, RateLimiter,
};
use crate::domain::types::{
    CONTINUATION_TTL_SECS, Identity, Purpose, RATE_LIMIT_MAX_ATTEMPTS, RATE_LIMIT_WINDOW_SECS,
};
use crate::error::AuthServiceError;
use crate::usecase::session::{SessionBundle, now_secs, session_bundle};

// ── Continuation tokens ──────────────────────────────────────────────────────

/// Claims for the short-lived token that binds "who is logging in" between
/// the begin step and the credential step. Structurally distinct from
/// session claims (the `typ` tag is required), so neither token can stand in
/// for the other.
#[derive(Debug, Serialize, Deserialize)]
pub struct ContinuationClaims {
    pub sub: String,
    pub uname: String,
    pub typ: String,
    pub exp: u64,
}

const CONTINUATION_TYP: &str = "continuation";

pub fn issue_continuation(identity: &Identity, secret: &str) -> Result<String, AuthServiceError> {
    let username = identity
        .username
        .clone()
        .ok_or(AuthServiceError::NotFound)?;
    let claims = ContinuationClaims {
        sub: identity.id.to_string(),
        uname: username,
        typ: CONTINUATION_TYP.to_owned(),
        exp: now_secs() + CONTINUATION_TTL_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthServiceError::Internal(e.into()))
}

/// Validate a continuation token, returning the bound identity reference.
pub fn validate_continuation(
    token: &str,
    secret: &str,
) -> Result<ContinuationClaims, AuthServiceError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<ContinuationClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthServiceError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthServiceError::SignatureInvalid,
        _ => AuthServiceError::Malformed,
    })?;

    if data.claims.typ != CONTINUATION_TYP {
        return Err(AuthServiceError::Malformed);
    }
    Ok(data.claims)
}

pub fn continuation_identity_id(claims: &ContinuationClaims) -> Result<Uuid, AuthServiceError> {
    claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AuthServiceError::Malformed)
}

// ── Public-ID generation ─────────────────────────────────────────────────────

const PUBLIC_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PUBLIC_ID_LEN: usize = 10;

/// Opaque public ID for a new identity: "OS-" + 10 uppercase alphanumerics.
pub fn generate_public_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..PUBLIC_ID_LEN)
        .map(|_| PUBLIC_ID_CHARSET[rng.random_range(0..PUBLIC_ID_CHARSET.len())] as char)
        .collect();
    format!("OS-{suffix}")
}

// ── Begin login (Start → IdentifierKnown) ────────────────────────────────────

pub struct BeginLoginInput {
    pub username: String,
    pub client: ClientMeta,
}

#[derive(Debug)]
pub struct BeginLoginOutput {
    pub continuation: String,
    pub has_passcode: bool,
}

pub struct BeginLoginUseCase<I, P, A, R>
where
    I: IdentityRepository,
    P: PasscodeRepository,
    A: AuditRepository,
    R: RateLimiter,
{
    pub identities: I,
    pub passcodes: P,
    pub audit: A,
    pub limiter: R,
    pub session_secret: String,
}

impl<I, P, A, R> BeginLoginUseCase<I, P, A, R>
where
    I: IdentityRepository,
    P: PasscodeRepository,
    A: AuditRepository,
    R: RateLimiter,
{
    pub async fn execute(
        &self,
        input: BeginLoginInput,
    ) -> Result<BeginLoginOutput, AuthServiceError> {
        let key = format!("login:{}", input.client.ip);
        let decision = self
            .limiter
            .allow(&key, RATE_LIMIT_MAX_ATTEMPTS, RATE_LIMIT_WINDOW_SECS)
            .await?;
        if !decision.allowed {
            self.audit
                .append(&SecurityEvent::new(
                    EventKind::RateLimitExceeded,
                    RiskLevel::High,
                    "login rate limit exceeded",
                    None,
                    EventDetail::RateLimit {
                        scope: "login".to_owned(),
                        key: input.client.ip.clone(),
                    },
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::RateLimited);
        }

        let Some(identity) = self.identities.find_by_username(&input.username).await? else {
            self.audit
                .append(&SecurityEvent::new(
                    EventKind::LoginFailed,
                    RiskLevel::Medium,
                    "login begun for unknown username",
                    None,
                    EventDetail::Login {
                        method: LoginMethod::Passcode,
                        identifier: Some(input.username.clone()),
                    },
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::NotFound);
        };

        let continuation = issue_continuation(&identity, &self.session_secret)?;
        let has_passcode = self.passcodes.find_by_identity(identity.id).await?.is_some();

        self.audit
            .append(&SecurityEvent::new(
                EventKind::LoginStarted,
                RiskLevel::Low,
                "login begun, continuation issued",
                Some(identity.id),
                EventDetail::Flow {
                    username: input.username.clone(),
                    has_passcode,
                },
                &input.client,
            ))
            .await?;

        Ok(BeginLoginOutput {
            continuation,
            has_passcode,
        })
    }
}

// ── Verify OTP (CodeOrCredentialPending → Verified → SessionIssued) ──────────

pub struct VerifyOtpInput {
    pub identifier: String,
    pub purpose: Purpose,
    pub code: String,
    pub client: ClientMeta,
}

pub struct VerifyOtpUseCase<I, O, A, R>
where
    I: IdentityRepository,
    O: OtpRepository,
    A: AuditRepository,
    R: RateLimiter,
{
    pub identities: I,
    pub codes: O,
    pub audit: A,
    pub limiter: R,
    pub session_secret: String,
}

impl<I, O, A, R> VerifyOtpUseCase<I, O, A, R>
where
    I: IdentityRepository,
    O: OtpRepository,
    A: AuditRepository,
    R: RateLimiter,
{
    pub async fn execute(&self, input: VerifyOtpInput) -> Result<SessionBundle, AuthServiceError> {
        let key = format!("login:{}", input.client.ip);
        let decision = self
            .limiter
            .allow(&key, RATE_LIMIT_MAX_ATTEMPTS, RATE_LIMIT_WINDOW_SECS)
            .await?;
        if !decision.allowed {
            self.audit
                .append(&SecurityEvent::new(
                    EventKind::RateLimitExceeded,
                    RiskLevel::High,
                    "otp verification rate limit exceeded",
                    None,
                    EventDetail::RateLimit {
                        scope: "login".to_owned(),
                        key: input.client.ip.clone(),
                    },
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::RateLimited);
        }

        let stored = self.codes.find(&input.identifier, input.purpose).await?;
        let stored = match stored {
            Some(code) if !code.consumed => code,
            // Consumed codes are indistinguishable from absent ones.
            _ => {
                self.fail_event(&input, "no live code for identifier").await?;
                return Err(AuthServiceError::NotFound);
            }
        };

        if stored.is_expired() {
            self.fail_event(&input, "code past expiry").await?;
            return Err(AuthServiceError::Expired);
        }
        if stored.is_exhausted() {
            self.fail_event(&input, "code attempt cap reached").await?;
            return Err(AuthServiceError::Exhausted);
        }
        if stored.code != input.code {
            // Count the failed comparison before returning.
            self.codes
                .increment_attempts(&input.identifier, input.purpose)
                .await?;
            self.fail_event(&input, "code mismatch").await?;
            return Err(AuthServiceError::InvalidCredential);
        }

        self.codes
            .mark_consumed(&input.identifier, input.purpose)
            .await?;

        let identity = match input.purpose {
            Purpose::Login => {
                let id = stored.identity_id.ok_or(AuthServiceError::SignupRequired)?;
                let identity = self
                    .identities
                    .find_by_id(id)
                    .await?
                    .ok_or(AuthServiceError::SignupRequired)?;
                self.identities.mark_login(identity.id).await?;
                self.audit
                    .append(&SecurityEvent::new(
                        EventKind::LoginSuccess,
                        RiskLevel::Low,
                        "otp login verified",
                        Some(identity.id),
                        EventDetail::Login {
                            method: LoginMethod::Otp,
                            identifier: Some(input.identifier.clone()),
                        },
                        &input.client,
                    ))
                    .await?;
                identity
            }
            Purpose::Signup => {
                // First successful verification creates the identity. A
                // concurrent signup for the same handle resolves to login.
                let identity = match self.identities.find_by_handle(&input.identifier).await? {
                    Some(existing) => existing,
                    None => {
                        let identity = Identity {
                            id: Uuid::new_v4(),
                            public_id: generate_public_id(),
                            username: None,
                            telegram_user_id: input.identifier.clone(),
                            is_setup_complete: false,
                            is_verified: true,
                            created_at: Utc::now(),
                            last_login_at: None,
                        };
                        self.identities.create(&identity).await?;
                        identity
                    }
                };
                self.identities.mark_login(identity.id).await?;
                self.audit
                    .append(&SecurityEvent::new(
                        EventKind::SignupCompleted,
                        RiskLevel::Low,
                        "signup verified, identity created",
                        Some(identity.id),
                        EventDetail::Login {
                            method: LoginMethod::Otp,
                            identifier: Some(input.identifier.clone()),
                        },
                        &input.client,
                    ))
                    .await?;
                identity
            }
        };

        let bundle = session_bundle(identity, &self.session_secret)?;
        self.audit
            .append(&SecurityEvent::new(
                EventKind::SessionIssued,
                RiskLevel::Low,
                "session issued",
                Some(bundle.identity.id),
                EventDetail::Session,
                &input.client,
            ))
            .await?;
        Ok(bundle)
    }

    async fn fail_event(
        &self,
        input: &VerifyOtpInput,
        description: &str,
    ) -> Result<(), AuthServiceError> {
        self.audit
            .append(&SecurityEvent::new(
                EventKind::OtpVerifyFailed,
                RiskLevel::Medium,
                description,
                None,
                EventDetail::Otp {
                    identifier: input.identifier.clone(),
                    purpose: input.purpose,
                    delivered: None,
                },
                &input.client,
            ))
            .await
    }
}
