use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use opal_auth::domain::audit::{ClientMeta, SecurityEvent};
use opal_auth::domain::repository::{
    AuditRepository, BiometricRepository, ChallengeCache, IdentityRepository, MessagePort,
    OtpRepository, PasscodeRepository, RateLimiter,
};
use opal_auth::domain::types::{
    BiometricCredential, DeviceClass, Identity, OneTimeCode, PasscodeCredential, Purpose,
    RateDecision,
};
use opal_auth::error::AuthServiceError;

// ── MockIdentityRepo ─────────────────────────────────────────────────────────

pub struct MockIdentityRepo {
    pub identities: Arc<Mutex<Vec<Identity>>>,
}

impl MockIdentityRepo {
    pub fn new(identities: Vec<Identity>) -> Self {
        Self {
            identities: Arc::new(Mutex::new(identities)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Shared handle to the internal list for post-execution inspection.
    pub fn identities_handle(&self) -> Arc<Mutex<Vec<Identity>>> {
        Arc::clone(&self.identities)
    }
}

impl IdentityRepository for MockIdentityRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthServiceError> {
        Ok(self
            .identities
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>, AuthServiceError> {
        Ok(self
            .identities
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.telegram_user_id == handle)
            .cloned())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Identity>, AuthServiceError> {
        Ok(self
            .identities
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.username.as_deref() == Some(username))
            .cloned())
    }

    async fn create(&self, identity: &Identity) -> Result<(), AuthServiceError> {
        self.identities.lock().unwrap().push(identity.clone());
        Ok(())
    }

    async fn mark_login(&self, id: Uuid) -> Result<(), AuthServiceError> {
        let mut identities = self.identities.lock().unwrap();
        if let Some(identity) = identities.iter_mut().find(|i| i.id == id) {
            identity.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn set_setup_complete(&self, id: Uuid) -> Result<(), AuthServiceError> {
        let mut identities = self.identities.lock().unwrap();
        if let Some(identity) = identities.iter_mut().find(|i| i.id == id) {
            identity.is_setup_complete = true;
        }
        Ok(())
    }
}

// ── MockOtpRepo ──────────────────────────────────────────────────────────────

pub struct MockOtpRepo {
    pub codes: Arc<Mutex<Vec<OneTimeCode>>>,
}

impl MockOtpRepo {
    pub fn new(codes: Vec<OneTimeCode>) -> Self {
        Self {
            codes: Arc::new(Mutex::new(codes)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn codes_handle(&self) -> Arc<Mutex<Vec<OneTimeCode>>> {
        Arc::clone(&self.codes)
    }
}

impl OtpRepository for MockOtpRepo {
    async fn find(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<Option<OneTimeCode>, AuthServiceError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.identifier == identifier && c.purpose == purpose)
            .cloned())
    }

    async fn put_reset(&self, code: &OneTimeCode) -> Result<(), AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        codes.retain(|c| !(c.identifier == code.identifier && c.purpose == code.purpose));
        codes.push(code.clone());
        Ok(())
    }

    async fn increment_attempts(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<(), AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        if let Some(c) = codes
            .iter_mut()
            .find(|c| c.identifier == identifier && c.purpose == purpose)
        {
            c.attempts += 1;
        }
        Ok(())
    }

    async fn mark_consumed(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<(), AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        if let Some(c) = codes
            .iter_mut()
            .find(|c| c.identifier == identifier && c.purpose == purpose)
        {
            c.consumed = true;
        }
        Ok(())
    }
}

// ── MockPasscodeRepo ─────────────────────────────────────────────────────────

pub struct MockPasscodeRepo {
    pub credentials: Arc<Mutex<Vec<PasscodeCredential>>>,
}

impl MockPasscodeRepo {
    pub fn new(credentials: Vec<PasscodeCredential>) -> Self {
        Self {
            credentials: Arc::new(Mutex::new(credentials)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn credentials_handle(&self) -> Arc<Mutex<Vec<PasscodeCredential>>> {
        Arc::clone(&self.credentials)
    }
}

impl PasscodeRepository for MockPasscodeRepo {
    async fn find_by_identity(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<PasscodeCredential>, AuthServiceError> {
        Ok(self
            .credentials
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.identity_id == identity_id)
            .cloned())
    }

    async fn upsert(&self, credential: &PasscodeCredential) -> Result<(), AuthServiceError> {
        let mut credentials = self.credentials.lock().unwrap();
        credentials.retain(|c| c.identity_id != credential.identity_id);
        credentials.push(credential.clone());
        Ok(())
    }
}

// ── MockBiometricRepo ────────────────────────────────────────────────────────

pub struct MockBiometricRepo {
    pub records: Arc<Mutex<Vec<BiometricCredential>>>,
}

impl MockBiometricRepo {
    pub fn new(records: Vec<BiometricCredential>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn records_handle(&self) -> Arc<Mutex<Vec<BiometricCredential>>> {
        Arc::clone(&self.records)
    }
}

impl BiometricRepository for MockBiometricRepo {
    async fn list_active(
        &self,
        identity_id: Uuid,
    ) -> Result<Vec<BiometricCredential>, AuthServiceError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.identity_id == identity_id && r.is_active)
            .cloned()
            .collect())
    }

    async fn count_active(&self, identity_id: Uuid) -> Result<u64, AuthServiceError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.identity_id == identity_id && r.is_active)
            .count() as u64)
    }

    async fn create(&self, credential: &BiometricCredential) -> Result<(), AuthServiceError> {
        self.records.lock().unwrap().push(credential.clone());
        Ok(())
    }

    async fn deactivate(
        &self,
        credential_id: &[u8],
        identity_id: Uuid,
    ) -> Result<bool, AuthServiceError> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| {
            r.credential_id == credential_id && r.identity_id == identity_id && r.is_active
        }) {
            Some(record) => {
                record.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_credential(
        &self,
        credential_id: &[u8],
        credential: &[u8],
    ) -> Result<(), AuthServiceError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.credential_id == credential_id) {
            record.credential = credential.to_vec();
            record.last_used_at = Some(Utc::now());
        }
        Ok(())
    }
}

// ── MockChallengeCache ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockChallengeCache {
    pub entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockChallengeCache {
    pub fn empty() -> Self {
        Self::default()
    }
}

impl ChallengeCache for MockChallengeCache {
    async fn set_registration_state(
        &self,
        identity_id: Uuid,
        ceremony_id: &str,
        state_json: &[u8],
    ) -> Result<(), AuthServiceError> {
        self.entries
            .lock()
            .unwrap()
            .insert(format!("reg:{identity_id}:{ceremony_id}"), state_json.to_vec());
        Ok(())
    }

    async fn take_registration_state(
        &self,
        identity_id: Uuid,
        ceremony_id: &str,
    ) -> Result<Option<Vec<u8>>, AuthServiceError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .remove(&format!("reg:{identity_id}:{ceremony_id}")))
    }

    async fn set_assertion_state(
        &self,
        username: &str,
        ceremony_id: &str,
        state_json: &[u8],
    ) -> Result<(), AuthServiceError> {
        self.entries
            .lock()
            .unwrap()
            .insert(format!("auth:{username}:{ceremony_id}"), state_json.to_vec());
        Ok(())
    }

    async fn take_assertion_state(
        &self,
        username: &str,
        ceremony_id: &str,
    ) -> Result<Option<Vec<u8>>, AuthServiceError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .remove(&format!("auth:{username}:{ceremony_id}")))
    }
}

// ── MockAudit ────────────────────────────────────────────────────────────────

pub struct MockAudit {
    pub events: Arc<Mutex<Vec<SecurityEvent>>>,
}

impl MockAudit {
    pub fn empty() -> Self {
        Self {
            events: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn events_handle(&self) -> Arc<Mutex<Vec<SecurityEvent>>> {
        Arc::clone(&self.events)
    }
}

impl AuditRepository for MockAudit {
    async fn append(&self, event: &SecurityEvent) -> Result<(), AuthServiceError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ── MockRateLimiter ──────────────────────────────────────────────────────────

pub struct MockRateLimiter {
    pub allowed: bool,
}

impl MockRateLimiter {
    pub fn allowing() -> Self {
        Self { allowed: true }
    }

    pub fn denying() -> Self {
        Self { allowed: false }
    }
}

impl RateLimiter for MockRateLimiter {
    async fn allow(
        &self,
        _key: &str,
        max_attempts: u32,
        _window_secs: u64,
    ) -> Result<RateDecision, AuthServiceError> {
        Ok(RateDecision {
            allowed: self.allowed,
            remaining: if self.allowed { max_attempts - 1 } else { 0 },
        })
    }
}

/// In-memory fixed-window counter with the production decision math.
/// Clearing `counts` stands in for the window elapsing.
pub struct MockCountingRateLimiter {
    pub counts: Arc<Mutex<HashMap<String, u64>>>,
}

impl MockCountingRateLimiter {
    pub fn empty() -> Self {
        Self {
            counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn counts_handle(&self) -> Arc<Mutex<HashMap<String, u64>>> {
        Arc::clone(&self.counts)
    }
}

impl RateLimiter for MockCountingRateLimiter {
    async fn allow(
        &self,
        key: &str,
        max_attempts: u32,
        _window_secs: u64,
    ) -> Result<RateDecision, AuthServiceError> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(key.to_owned()).or_insert(0);
        *count += 1;
        Ok(opal_auth::infra::cache::window_decision(*count, max_attempts))
    }
}

// ── MockMessenger ────────────────────────────────────────────────────────────

pub struct MockMessenger {
    pub fail: bool,
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockMessenger {
    pub fn working() -> Self {
        Self {
            fail: false,
            sent: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn broken() -> Self {
        Self {
            fail: true,
            sent: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn sent_handle(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        Arc::clone(&self.sent)
    }
}

impl MessagePort for MockMessenger {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), AuthServiceError> {
        if self.fail {
            return Err(AuthServiceError::UpstreamUnavailable);
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_owned(), text.to_owned()));
        Ok(())
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub fn test_identity() -> Identity {
    Identity {
        id: Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap(),
        public_id: "OS-TEST123456".to_owned(),
        username: Some("satoshi".to_owned()),
        telegram_user_id: "telegram_42".to_owned(),
        is_setup_complete: true,
        is_verified: true,
        created_at: Utc::now(),
        last_login_at: None,
    }
}

pub fn test_one_time_code(identity_id: Option<Uuid>, purpose: Purpose) -> OneTimeCode {
    OneTimeCode {
        identifier: "telegram_42".to_owned(),
        purpose,
        code: "482913".to_owned(),
        expires_at: Utc::now() + chrono::Duration::seconds(600),
        attempts: 0,
        consumed: false,
        identity_id,
        created_at: Utc::now(),
    }
}

pub fn test_biometric_record(identity_id: Uuid, credential_id: Vec<u8>) -> BiometricCredential {
    BiometricCredential {
        credential_id,
        identity_id,
        credential: vec![],
        device_name: "Pixel 9".to_owned(),
        device_class: DeviceClass::Fingerprint,
        is_active: true,
        created_at: Utc::now(),
        last_used_at: None,
    }
}

pub fn test_client() -> ClientMeta {
    ClientMeta {
        ip: "203.0.113.9".to_owned(),
        user_agent: "integration-tests".to_owned(),
    }
}

pub const TEST_SESSION_SECRET: &str = "test-session-secret-for-unit-tests-only";
