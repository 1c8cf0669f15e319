use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminator scoping a one-time code (and the flow it belongs to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Signup,
    Login,
}

impl Purpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Login => "login",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "signup" => Some(Self::Signup),
            "login" => Some(Self::Login),
            _ => None,
        }
    }
}

/// Durable user record.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    /// Opaque public ID shown to the user ("OS-" + 10 uppercase alphanumerics).
    pub public_id: String,
    /// Unique, immutable once set. None until the user picks one during setup.
    pub username: Option<String>,
    /// Telegram user ID used as the external login handle.
    pub telegram_user_id: String,
    pub is_setup_complete: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// One-time code keyed by `(identifier, purpose)`.
#[derive(Debug, Clone)]
pub struct OneTimeCode {
    pub identifier: String,
    pub purpose: Purpose,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
    pub consumed: bool,
    /// None for signup codes until the identity is created on verification.
    pub identity_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl OneTimeCode {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= OTP_MAX_ATTEMPTS
    }
}

/// Stored passcode credential (argon2 PHC hash, never plaintext).
#[derive(Debug, Clone)]
pub struct PasscodeCredential {
    pub identity_id: Uuid,
    pub passcode_hash: String,
    pub updated_at: DateTime<Utc>,
}

/// Authenticator class reported at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Fingerprint,
    Face,
    Unknown,
}

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fingerprint => "fingerprint",
            Self::Face => "face",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "fingerprint" => Self::Fingerprint,
            "face" => Self::Face,
            _ => Self::Unknown,
        }
    }
}

/// Stored WebAuthn credential.
#[derive(Debug, Clone)]
pub struct BiometricCredential {
    pub credential_id: Vec<u8>,
    pub identity_id: Uuid,
    /// JSON-serialized `webauthn_rs::Passkey` (with counter).
    pub credential: Vec<u8>,
    pub device_name: String,
    pub device_class: DeviceClass,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    /// Attempts left in the current window (0 when not allowed).
    pub remaining: u32,
}

/// One-time-code length in digits.
pub const OTP_LEN: usize = 6;

/// One-time-code time-to-live in seconds (10 minutes).
pub const OTP_TTL_SECS: i64 = 600;

/// Failed-verification cap per code.
pub const OTP_MAX_ATTEMPTS: i32 = 5;

/// Passcode length in digits.
pub const PASSCODE_LEN: usize = 6;

/// Maximum active biometric credentials per identity.
pub const MAX_BIOMETRIC_CREDENTIALS: u64 = 5;

/// WebAuthn ceremony state TTL in seconds (5 minutes).
pub const CHALLENGE_TTL_SECS: u64 = 300;

/// Continuation-token lifetime in seconds (5 minutes).
pub const CONTINUATION_TTL_SECS: u64 = 300;

/// Rate-limit policy applied to every protected endpoint class.
pub const RATE_LIMIT_MAX_ATTEMPTS: u32 = 5;

/// Rate-limit window in seconds (15 minutes).
pub const RATE_LIMIT_WINDOW_SECS: u64 = 900;
