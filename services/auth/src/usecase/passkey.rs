//! WebAuthn credential ceremonies.
//!
//! Ceremony state lives in Redis under a short TTL and is consumed on take,
//! so a challenge can be answered at most once and only within its window.
//! There is no client-asserted success anywhere: registration and assertion
//! results are only accepted out of `webauthn_rs` verification.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use webauthn_rs::prelude::*;

use crate::domain::audit::{
    ClientMeta, EventDetail, EventKind, LoginMethod, RiskLevel, SecurityEvent,
};
use crate::domain::repository::{
    AuditRepository, BiometricRepository, ChallengeCache, IdentityRepository,
};
use crate::domain::types::{BiometricCredential, DeviceClass, MAX_BIOMETRIC_CREDENTIALS};
use crate::error::AuthServiceError;
use crate::usecase::flow::{continuation_identity_id, validate_continuation};
use crate::usecase::session::{SessionBundle, session_bundle};

// ── List credentials ──────────────────────────────────────────────────────────

pub struct CredentialInfo {
    pub credential_id: Vec<u8>,
    pub device_name: String,
    pub device_class: DeviceClass,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

pub struct ListCredentialsUseCase<B>
where
    B: BiometricRepository,
{
    pub biometrics: B,
}

impl<B> ListCredentialsUseCase<B>
where
    B: BiometricRepository,
{
    pub async fn execute(
        &self,
        identity_id: Uuid,
    ) -> Result<Vec<CredentialInfo>, AuthServiceError> {
        let records = self.biometrics.list_active(identity_id).await?;
        Ok(records
            .into_iter()
            .map(|r| CredentialInfo {
                credential_id: r.credential_id,
                device_name: r.device_name,
                device_class: r.device_class,
                created_at: r.created_at,
                last_used_at: r.last_used_at,
            })
            .collect())
    }
}

// ── Remove credential ─────────────────────────────────────────────────────────

pub struct RemoveCredentialUseCase<B, A>
where
    B: BiometricRepository,
    A: AuditRepository,
{
    pub biometrics: B,
    pub audit: A,
}

impl<B, A> RemoveCredentialUseCase<B, A>
where
    B: BiometricRepository,
    A: AuditRepository,
{
    /// Soft-deletes. Returns `NotFound` if the credential is missing, already
    /// removed, or belongs to a different identity.
    pub async fn execute(
        &self,
        credential_id: &[u8],
        identity_id: Uuid,
        client: &ClientMeta,
    ) -> Result<(), AuthServiceError> {
        let removed = self
            .biometrics
            .deactivate(credential_id, identity_id)
            .await?;
        if !removed {
            return Err(AuthServiceError::NotFound);
        }
        self.audit
            .append(&SecurityEvent::new(
                EventKind::BiometricRemoved,
                RiskLevel::Medium,
                "biometric credential removed",
                Some(identity_id),
                EventDetail::Biometric {
                    credential_id: Some(encode_credential_id(credential_id)),
                    suspected_replay: false,
                },
                client,
            ))
            .await?;
        Ok(())
    }
}

fn encode_credential_id(credential_id: &[u8]) -> String {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    URL_SAFE_NO_PAD.encode(credential_id)
}

fn registration_failure(
    description: &str,
    identity_id: Uuid,
    credential_id: Option<&[u8]>,
    client: &ClientMeta,
) -> SecurityEvent {
    SecurityEvent::new(
        EventKind::BiometricRegistrationFailed,
        RiskLevel::Medium,
        description,
        Some(identity_id),
        EventDetail::Biometric {
            credential_id: credential_id.map(encode_credential_id),
            suspected_replay: false,
        },
        client,
    )
}

/// Pairs each stored record with its own deserialized passkey. Rows that
/// fail to decode are dropped, never shifting another row's pairing.
fn decode_credentials(stored: &[BiometricCredential]) -> Vec<(&BiometricCredential, Passkey)> {
    stored
        .iter()
        .filter_map(|r| serde_json::from_slice(&r.credential).ok().map(|pk| (r, pk)))
        .collect()
}

/// Rejected continuation tokens are audited as failed logins; the token
/// carries no trustworthy identity, so the event stays unattributed.
fn continuation_rejected(client: &ClientMeta) -> SecurityEvent {
    SecurityEvent::new(
        EventKind::LoginFailed,
        RiskLevel::Medium,
        "continuation token rejected",
        None,
        EventDetail::Login {
            method: LoginMethod::Biometric,
            identifier: None,
        },
        client,
    )
}

// ── Begin registration ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct BeginRegistrationOutput {
    pub ceremony_id: String,
    pub challenge: CreationChallengeResponse,
}

pub struct BeginRegistrationUseCase<I, B, C, A>
where
    I: IdentityRepository,
    B: BiometricRepository,
    C: ChallengeCache,
    A: AuditRepository,
{
    pub identities: I,
    pub biometrics: B,
    pub cache: C,
    pub audit: A,
    pub webauthn: Arc<Webauthn>,
}

impl<I, B, C, A> BeginRegistrationUseCase<I, B, C, A>
where
    I: IdentityRepository,
    B: BiometricRepository,
    C: ChallengeCache,
    A: AuditRepository,
{
    pub async fn execute(
        &self,
        identity_id: Uuid,
        client: &ClientMeta,
    ) -> Result<BeginRegistrationOutput, AuthServiceError> {
        let identity = self
            .identities
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthServiceError::NotFound)?;

        if self.biometrics.count_active(identity_id).await? >= MAX_BIOMETRIC_CREDENTIALS {
            self.audit
                .append(&registration_failure(
                    "credential quota reached",
                    identity_id,
                    None,
                    client,
                ))
                .await?;
            return Err(AuthServiceError::QuotaExceeded);
        }

        // Excluding existing credentials makes the authenticator refuse a
        // duplicate registration of itself.
        let existing = self.biometrics.list_active(identity_id).await?;
        let exclude: Option<Vec<CredentialID>> = if existing.is_empty() {
            None
        } else {
            Some(
                existing
                    .iter()
                    .map(|r| CredentialID::from(r.credential_id.clone()))
                    .collect(),
            )
        };

        let display_name = identity
            .username
            .clone()
            .unwrap_or_else(|| identity.public_id.clone());
        let (ccr, reg_state) = self
            .webauthn
            .start_passkey_registration(identity_id, &display_name, &display_name, exclude)
            .map_err(|e| AuthServiceError::Internal(anyhow::anyhow!("{e}")))?;

        let ceremony_id = Uuid::new_v4().to_string();
        let state_json =
            serde_json::to_vec(&reg_state).map_err(|e| AuthServiceError::Internal(e.into()))?;
        self.cache
            .set_registration_state(identity_id, &ceremony_id, &state_json)
            .await?;

        Ok(BeginRegistrationOutput {
            ceremony_id,
            challenge: ccr,
        })
    }
}

// ── Complete registration ─────────────────────────────────────────────────────

pub struct CompleteRegistrationInput {
    pub identity_id: Uuid,
    pub ceremony_id: String,
    pub credential: RegisterPublicKeyCredential,
    pub device_name: String,
    pub device_class: DeviceClass,
    pub client: ClientMeta,
}

pub struct CompleteRegistrationUseCase<B, C, A>
where
    B: BiometricRepository,
    C: ChallengeCache,
    A: AuditRepository,
{
    pub biometrics: B,
    pub cache: C,
    pub audit: A,
    pub webauthn: Arc<Webauthn>,
}

impl<B, C, A> CompleteRegistrationUseCase<B, C, A>
where
    B: BiometricRepository,
    C: ChallengeCache,
    A: AuditRepository,
{
    pub async fn execute(
        &self,
        input: CompleteRegistrationInput,
    ) -> Result<(), AuthServiceError> {
        let Some(state_json) = self
            .cache
            .take_registration_state(input.identity_id, &input.ceremony_id)
            .await?
        else {
            self.audit
                .append(&registration_failure(
                    "ceremony expired or already answered",
                    input.identity_id,
                    None,
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::Expired);
        };

        let Ok(reg_state) = serde_json::from_slice::<PasskeyRegistration>(&state_json) else {
            self.audit
                .append(&registration_failure(
                    "ceremony state undecodable",
                    input.identity_id,
                    None,
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::Expired);
        };

        let passkey = match self
            .webauthn
            .finish_passkey_registration(&input.credential, &reg_state)
        {
            Ok(passkey) => passkey,
            Err(_) => {
                self.audit
                    .append(&registration_failure(
                        "attestation verification failed",
                        input.identity_id,
                        None,
                        &input.client,
                    ))
                    .await?;
                return Err(AuthServiceError::InvalidCredential);
            }
        };

        let cred_id = passkey.cred_id().to_vec();

        // The same authenticator registered twice for one identity is a
        // duplicate, even if the client ignored the exclude list.
        let existing = self.biometrics.list_active(input.identity_id).await?;
        if existing.iter().any(|r| r.credential_id == cred_id) {
            self.audit
                .append(&registration_failure(
                    "credential already registered",
                    input.identity_id,
                    Some(&cred_id),
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::AlreadyExists);
        }
        // Re-check the quota at completion — two ceremonies can race.
        if existing.len() as u64 >= MAX_BIOMETRIC_CREDENTIALS {
            self.audit
                .append(&registration_failure(
                    "credential quota reached",
                    input.identity_id,
                    Some(&cred_id),
                    &input.client,
                ))
                .await?;
            return Err(AuthServiceError::QuotaExceeded);
        }

        let credential_bytes =
            serde_json::to_vec(&passkey).map_err(|e| AuthServiceError::Internal(e.into()))?;
        let record = BiometricCredential {
            credential_id: cred_id.clone(),
            identity_id: input.identity_id,
            credential: credential_bytes,
            device_name: input.device_name,
            device_class: input.device_class,
            is_active: true,
            created_at: Utc::now(),
            last_used_at: None,
        };
        self.biometrics.create(&record).await?;

        self.audit
            .append(&SecurityEvent::new(
                EventKind::BiometricRegistered,
                RiskLevel::Low,
                "biometric credential registered",
                Some(input.identity_id),
                EventDetail::Biometric {
                    credential_id: Some(encode_credential_id(&cred_id)),
                    suspected_replay: false,
                },
                &input.client,
            ))
            .await?;
        Ok(())
    }
}

// ── Begin assertion ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct BeginAssertionOutput {
    pub ceremony_id: String,
    pub challenge: RequestChallengeResponse,
}

pub struct BeginAssertionUseCase<I, B, C, A>
where
    I: IdentityRepository,
    B: BiometricRepository,
    C: ChallengeCache,
    A: AuditRepository,
{
    pub identities: I,
    pub biometrics: B,
    pub cache: C,
    pub audit: A,
    pub webauthn: Arc<Webauthn>,
    pub session_secret: String,
}

impl<I, B, C, A> BeginAssertionUseCase<I, B, C, A>
where
    I: IdentityRepository,
    B: BiometricRepository,
    C: ChallengeCache,
    A: AuditRepository,
{
    pub async fn execute(
        &self,
        continuation: &str,
        client: &ClientMeta,
    ) -> Result<BeginAssertionOutput, AuthServiceError> {
        let claims = match validate_continuation(continuation, &self.session_secret) {
            Ok(claims) => claims,
            Err(e) => {
                self.audit.append(&continuation_rejected(client)).await?;
                return Err(e);
            }
        };
        let identity_id = continuation_identity_id(&claims)?;
        self.identities
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthServiceError::NotFound)?;

        let stored = self.biometrics.list_active(identity_id).await?;
        if stored.is_empty() {
            self.audit
                .append(&SecurityEvent::new(
                    EventKind::BiometricAssertionFailed,
                    RiskLevel::Medium,
                    "assertion begun without enrolled credentials",
                    Some(identity_id),
                    EventDetail::Biometric {
                        credential_id: None,
                        suspected_replay: false,
                    },
                    client,
                ))
                .await?;
            return Err(AuthServiceError::NotFound);
        }
        let passkey_list: Vec<Passkey> = decode_credentials(&stored)
            .into_iter()
            .map(|(_, pk)| pk)
            .collect();

        let (rcr, auth_state) = self
            .webauthn
            .start_passkey_authentication(&passkey_list)
            .map_err(|e| AuthServiceError::Internal(anyhow::anyhow!("{e}")))?;

        let ceremony_id = Uuid::new_v4().to_string();
        let state_json =
            serde_json::to_vec(&auth_state).map_err(|e| AuthServiceError::Internal(e.into()))?;
        self.cache
            .set_assertion_state(&claims.uname, &ceremony_id, &state_json)
            .await?;

        Ok(BeginAssertionOutput {
            ceremony_id,
            challenge: rcr,
        })
    }
}

// ── Complete assertion ────────────────────────────────────────────────────────

pub struct CompleteAssertionInput {
    pub continuation: String,
    pub ceremony_id: String,
    pub credential: PublicKeyCredential,
    pub client: ClientMeta,
}

pub struct CompleteAssertionUseCase<I, B, C, A>
where
    I: IdentityRepository,
    B: BiometricRepository,
    C: ChallengeCache,
    A: AuditRepository,
{
    pub identities: I,
    pub biometrics: B,
    pub cache: C,
    pub audit: A,
    pub webauthn: Arc<Webauthn>,
    pub session_secret: String,
}

impl<I, B, C, A> CompleteAssertionUseCase<I, B, C, A>
where
    I: IdentityRepository,
    B: BiometricRepository,
    C: ChallengeCache,
    A: AuditRepository,
{
    pub async fn execute(
        &self,
        input: CompleteAssertionInput,
    ) -> Result<SessionBundle, AuthServiceError> {
        let claims = match validate_continuation(&input.continuation, &self.session_secret) {
            Ok(claims) => claims,
            Err(e) => {
                self.audit
                    .append(&continuation_rejected(&input.client))
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

        let expired_ceremony = |description: &str| {
            SecurityEvent::new(
                EventKind::BiometricAssertionFailed,
                RiskLevel::Medium,
                description,
                Some(identity.id),
                EventDetail::Biometric {
                    credential_id: None,
                    suspected_replay: false,
                },
                &input.client,
            )
        };
        let Some(state_json) = self
            .cache
            .take_assertion_state(&claims.uname, &input.ceremony_id)
            .await?
        else {
            self.audit
                .append(&expired_ceremony("ceremony expired or already answered"))
                .await?;
            return Err(AuthServiceError::Expired);
        };
        let Ok(auth_state) = serde_json::from_slice::<PasskeyAuthentication>(&state_json) else {
            self.audit
                .append(&expired_ceremony("ceremony state undecodable"))
                .await?;
            return Err(AuthServiceError::Expired);
        };

        let stored = self.biometrics.list_active(identity.id).await?;

        let auth_result = match self
            .webauthn
            .finish_passkey_authentication(&input.credential, &auth_state)
        {
            Ok(result) => result,
            Err(_) => {
                // A failed assertion with a credential ID we know looks like
                // a replayed or cloned authenticator; an unknown ID is more
                // likely a stray client.
                let supplied_id: &[u8] = input.credential.raw_id.as_ref();
                let known = stored.iter().any(|r| r.credential_id == supplied_id);
                self.audit
                    .append(&SecurityEvent::new(
                        EventKind::BiometricAssertionFailed,
                        if known { RiskLevel::High } else { RiskLevel::Medium },
                        "assertion verification failed",
                        Some(identity.id),
                        EventDetail::Biometric {
                            credential_id: Some(encode_credential_id(supplied_id)),
                            suspected_replay: known,
                        },
                        &input.client,
                    ))
                    .await?;
                return Err(AuthServiceError::InvalidCredential);
            }
        };

        // Persist forward-moving counters so a cloned authenticator replaying
        // an old counter is rejected next time. Pairing is per record:
        // `update_credential` only matches the passkey the assertion used.
        for (record, mut pk) in decode_credentials(&stored) {
            if pk.update_credential(&auth_result) == Some(true) {
                let updated_bytes =
                    serde_json::to_vec(&pk).map_err(|e| AuthServiceError::Internal(e.into()))?;
                self.biometrics
                    .update_credential(&record.credential_id, &updated_bytes)
                    .await?;
            }
        }

        self.identities.mark_login(identity.id).await?;
        self.audit
            .append(&SecurityEvent::new(
                EventKind::LoginSuccess,
                RiskLevel::Low,
                "biometric login verified",
                Some(identity.id),
                EventDetail::Login {
                    method: LoginMethod::Biometric,
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
