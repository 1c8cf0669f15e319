#![allow(async_fn_in_trait)]

use uuid::Uuid;

use crate::domain::audit::SecurityEvent;
use crate::domain::types::{
    BiometricCredential, Identity, OneTimeCode, PasscodeCredential, Purpose, RateDecision,
};
use crate::error::AuthServiceError;

/// Repository for durable identities.
pub trait IdentityRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthServiceError>;

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>, AuthServiceError>;

    async fn find_by_username(&self, username: &str)
    -> Result<Option<Identity>, AuthServiceError>;

    /// Insert a new identity created by signup verification.
    async fn create(&self, identity: &Identity) -> Result<(), AuthServiceError>;

    /// Record a successful login (sets last_login_at = now).
    async fn mark_login(&self, id: Uuid) -> Result<(), AuthServiceError>;

    async fn set_setup_complete(&self, id: Uuid) -> Result<(), AuthServiceError>;
}

/// Repository for one-time codes keyed by `(identifier, purpose)`.
pub trait OtpRepository: Send + Sync {
    async fn find(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<Option<OneTimeCode>, AuthServiceError>;

    /// Replace any existing code for the key with a fresh one, resetting the
    /// attempt counter. Must be atomic so no two codes are ever live at once.
    async fn put_reset(&self, code: &OneTimeCode) -> Result<(), AuthServiceError>;

    /// Increment the failed-attempt counter for a live code.
    async fn increment_attempts(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<(), AuthServiceError>;

    /// Mark a code consumed so it can never verify again.
    async fn mark_consumed(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<(), AuthServiceError>;
}

/// Repository for passcode credentials (one per identity).
pub trait PasscodeRepository: Send + Sync {
    async fn find_by_identity(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<PasscodeCredential>, AuthServiceError>;

    /// Insert or replace the stored hash for an identity.
    async fn upsert(&self, credential: &PasscodeCredential) -> Result<(), AuthServiceError>;
}

/// Repository for WebAuthn credentials.
pub trait BiometricRepository: Send + Sync {
    /// Active (non-removed) credentials for an identity.
    async fn list_active(
        &self,
        identity_id: Uuid,
    ) -> Result<Vec<BiometricCredential>, AuthServiceError>;

    async fn count_active(&self, identity_id: Uuid) -> Result<u64, AuthServiceError>;

    async fn create(&self, credential: &BiometricCredential) -> Result<(), AuthServiceError>;

    /// Soft-delete. Returns `true` if an active credential of the identity
    /// was deactivated, `false` if none matched.
    async fn deactivate(
        &self,
        credential_id: &[u8],
        identity_id: Uuid,
    ) -> Result<bool, AuthServiceError>;

    /// Replace the serialized credential (persists counter updates) and
    /// stamp last_used_at.
    async fn update_credential(
        &self,
        credential_id: &[u8],
        credential: &[u8],
    ) -> Result<(), AuthServiceError>;
}

/// Cache for WebAuthn ceremony states (Redis, short TTL, consumed on take).
pub trait ChallengeCache: Send + Sync {
    async fn set_registration_state(
        &self,
        identity_id: Uuid,
        ceremony_id: &str,
        state_json: &[u8],
    ) -> Result<(), AuthServiceError>;

    async fn take_registration_state(
        &self,
        identity_id: Uuid,
        ceremony_id: &str,
    ) -> Result<Option<Vec<u8>>, AuthServiceError>;

    async fn set_assertion_state(
        &self,
        username: &str,
        ceremony_id: &str,
        state_json: &[u8],
    ) -> Result<(), AuthServiceError>;

    async fn take_assertion_state(
        &self,
        username: &str,
        ceremony_id: &str,
    ) -> Result<Option<Vec<u8>>, AuthServiceError>;
}

/// Append-only audit sink.
pub trait AuditRepository: Send + Sync {
    async fn append(&self, event: &SecurityEvent) -> Result<(), AuthServiceError>;
}

/// Per-key fixed-window rate limiter.
pub trait RateLimiter: Send + Sync {
    /// Count one attempt against `key` and decide whether it is allowed.
    /// Must be safe under concurrent calls for the same key.
    async fn allow(
        &self,
        key: &str,
        max_attempts: u32,
        window_secs: u64,
    ) -> Result<RateDecision, AuthServiceError>;
}

/// Outbound delivery channel (Telegram). Unreliable by contract: failure to
/// deliver must not fail issuance.
pub trait MessagePort: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), AuthServiceError>;
}
