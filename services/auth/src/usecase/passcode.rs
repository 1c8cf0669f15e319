//! Passcode set/change and verification.
//!
//! Only a salted argon2 hash is ever stored or compared; the plaintext
//! 6-digit secret is never persisted or logged. "Forgot passcode" is not a
//! concern here — resets go back through the one-time-code flow.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, password_hash::rand_core::OsRng};
use chrono::Utc;
use uuid::Uuid;

use crate::domain::audit::{
    ClientMeta, EventDetail, EventKind, LoginMethod, RiskLevel, SecurityEvent,
};
use crate::domain::repository::{
    AuditRepository, IdentityRepository, PasscodeRepository, RateLimiter,
};
use crate::domain::types::{
    PASSCODE_LEN, PasscodeCredential, RATE_LIMIT_MAX_ATTEMPTS, RATE_LIMIT_WINDOW_SECS,
};
use crate::error::AuthServiceError;
use crate::usecase::flow::{continuation_identity_id, validate_continuation};
use crate::usecase::session::{SessionBundle, session_bundle};

fn is_valid_passcode(passcode: &str) -> bool {
    passcode.len() == PASSCODE_LEN && passcode.bytes().all(|b| b.is_ascii_digit())
}

fn hash_passcode(passcode: &str) -> Result<String, AuthServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(passcode.as_bytes(), &salt)
        .map_err(|e| AuthServiceError::Internal(anyhow::anyhow!("passcode hash: {e}")))?;
    Ok(hash.to_string())
}

fn verify_passcode_hash(passcode: &str, stored_hash: &str) -> Result<bool, AuthServiceError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AuthServiceError::Internal(anyhow::anyhow!("stored hash malformed: {e}")))?;
    Ok(Argon2::default()
        .verify_password(passcode.as_bytes(), &parsed)
        .is_ok())
}

// ── Set or change ────────────────────────────────────────────────────────────

pub struct SetPasscodeUseCase<I, P, A>
where
    I: IdentityRepository,
    P: PasscodeRepository,
    A: AuditRepository,
{
    pub identities: I,
    pub passcodes: P,
    pub audit: A,
}

impl<I, P, A> SetPasscodeUseCase<I, P, A>
where
    I: IdentityRepository,
    P: PasscodeRepository,
    A: AuditRepository,
{
    /// Replaces any previous hash — the old passcode stops verifying at once.
    /// Setting the first passcode completes account setup.
    pub async fn execute(
        &self,
        identity_id: Uuid,
        new_passcode: &str,
        client: &ClientMeta,
    ) -> Result<(), AuthServiceError> {
        if !is_valid_passcode(new_passcode) {
            self.audit
                .append(&SecurityEvent::new(
                    EventKind::PasscodeChangeFailed,
                    RiskLevel::Low,
                    "malformed passcode rejected",
                    Some(identity_id),
                    EventDetail::Passcode,
                    client,
                ))
                .await?;
            return Err(AuthServiceError::InvalidCredential);
        }
        let identity = self
            .identities
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthServiceError::NotFound)?;

        let credential = PasscodeCredential {
            identity_id: identity.id,
            passcode_hash: hash_passcode(new_passcode)?,
            updated_at: Utc::now(),
        };
        self.passcodes.upsert(&credential).await?;

        if !identity.is_setup_complete {
            self.identities.set_setup_complete(identity.id).await?;
        }

        self.audit
            .append(&SecurityEvent::new(
                EventKind::PasscodeChanged,
                RiskLevel::Medium,
                "passcode set or changed",
                Some(identity.id),
                EventDetail::Passcode,
                client,
            ))
            .await?;
        Ok(())
    }
}

// ── Verify (login step) ──────────────────────────────────────────────────────

pub struct VerifyPasscodeInput {
    /// Continuation token from `POST /auth/login/begin`.
    pub continuation: String,
    pub passcode: String,
    pub client: ClientMeta,
}

pub struct VerifyPasscodeUseCase<I, P, A, R>
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

impl<I, P, A, R> VerifyPasscodeUseCase<I, P, A, R>
where
    I: IdentityRepository,
    P: PasscodeRepository,
    A: AuditRepository,
    R: RateLimiter,
{
    pub async fn execute(
        &self,
        input: VerifyPasscodeInput,
    ) -> Result<SessionBundle, AuthServiceError> {
        let key = format!("passcode:{}", input.client.ip);
        let decision = self
            .limiter
            .allow(&key, RATE_LIMIT_MAX_ATTEMPTS, RATE_LIMIT_WINDOW_SECS)
            .await?;
        if !decision.allowed {
            self.audit
                .append(&SecurityEvent::new(
                    EventKind::RateLimitExceeded,
                    RiskLevel::High,
                    "passcode verification rate limit exceeded",
                    None,
                    EventDetail::RateLimit {
                        scope: "passcode".to_owned(),
                        key: input.client.ip.clone(),
                    },
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::RateLimited);
        }

        let claims = match validate_continuation(&input.continuation, &self.session_secret) {
            Ok(claims) => claims,
            Err(e) => {
                // The token carries no trustworthy identity, so the event
                // stays unattributed.
                self.audit
                    .append(&SecurityEvent::new(
                        EventKind::LoginFailed,
                        RiskLevel::Medium,
                        "continuation token rejected",
                        None,
                        EventDetail::Login {
                            method: LoginMethod::Passcode,
                            identifier: None,
                        },
                        &input.client,
                    ))
                    .await?;
                return Err(e);
            }
        };
        let identity_id = continuation_identity_id(&claims)?;
        let identity = self
            .identities
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthServiceError::NotFound)?;

        let ok = if is_valid_passcode(&input.passcode) {
            match self.passcodes.find_by_identity(identity.id).await? {
                Some(credential) => {
                    verify_passcode_hash(&input.passcode, &credential.passcode_hash)?
                }
                None => {
                    // No passcode enrolled: still an audited failure.
                    self.audit
                        .append(&SecurityEvent::new(
                            EventKind::PasscodeVerifyFailed,
                            RiskLevel::Medium,
                            "no passcode enrolled",
                            Some(identity.id),
                            EventDetail::Passcode,
                            &input.client,
                        ))
                        .await?;
                    return Err(AuthServiceError::NotFound);
                }
            }
        } else {
            false
        };

        if !ok {
            self.audit
                .append(&SecurityEvent::new(
                    EventKind::PasscodeVerifyFailed,
                    RiskLevel::Medium,
                    "passcode mismatch",
                    Some(identity.id),
                    EventDetail::Passcode,
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::InvalidCredential);
        }

        self.identities.mark_login(identity.id).await?;
        self.audit
            .append(&SecurityEvent::new(
                EventKind::LoginSuccess,
                RiskLevel::Low,
                "passcode login verified",
                Some(identity.id),
                EventDetail::Login {
                    method: LoginMethod::Passcode,
                    identifier: identity.username.clone(),
                },
                &input.client,
            ))
            .await?;

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
}
