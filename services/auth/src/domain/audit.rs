//! Security audit events.
//!
//! Every authentication-relevant transition appends exactly one event; audit
//! writes are part of the operation contract, not optional cleanup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::Purpose;

/// Closed enumeration of auditable event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OtpIssued,
    OtpVerifyFailed,
    LoginStarted,
    LoginSuccess,
    LoginFailed,
    SignupCompleted,
    RateLimitExceeded,
    PasscodeChanged,
    PasscodeChangeFailed,
    PasscodeVerifyFailed,
    BiometricRegistered,
    BiometricRegistrationFailed,
    BiometricRemoved,
    BiometricAssertionFailed,
    SessionIssued,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OtpIssued => "otp_issued",
            Self::OtpVerifyFailed => "otp_verify_failed",
            Self::LoginStarted => "login_started",
            Self::LoginSuccess => "login_success",
            Self::LoginFailed => "login_failed",
            Self::SignupCompleted => "signup_completed",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::PasscodeChanged => "passcode_changed",
            Self::PasscodeChangeFailed => "passcode_change_failed",
            Self::PasscodeVerifyFailed => "passcode_verify_failed",
            Self::BiometricRegistered => "biometric_registered",
            Self::BiometricRegistrationFailed => "biometric_registration_failed",
            Self::BiometricRemoved => "biometric_removed",
            Self::BiometricAssertionFailed => "biometric_assertion_failed",
            Self::SessionIssued => "session_issued",
        }
    }
}

/// Risk severity attached to every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Authentication method recorded on login events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    Otp,
    Passcode,
    Biometric,
}

/// Per-kind event payload. A closed set of shapes (serde-tagged) rather than
/// an open bag of fields, so audit consumers can rely on the shape per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventDetail {
    Otp {
        identifier: String,
        purpose: Purpose,
        /// Present on issuance events only.
        #[serde(skip_serializing_if = "Option::is_none")]
        delivered: Option<bool>,
    },
    Login {
        method: LoginMethod,
        #[serde(skip_serializing_if = "Option::is_none")]
        identifier: Option<String>,
    },
    /// Begin-login step: username resolved, continuation issued.
    Flow {
        username: String,
        has_passcode: bool,
    },
    RateLimit {
        scope: String,
        key: String,
    },
    Passcode,
    Biometric {
        #[serde(skip_serializing_if = "Option::is_none")]
        credential_id: Option<String>,
        suspected_replay: bool,
    },
    Session,
}

/// Client request metadata carried into every event.
#[derive(Debug, Clone)]
pub struct ClientMeta {
    pub ip: String,
    pub user_agent: String,
}

/// Immutable audit record.
#[derive(Debug, Clone)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub description: String,
    pub identity_id: Option<Uuid>,
    pub detail: EventDetail,
    pub client_ip: String,
    pub user_agent: String,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn new(
        kind: EventKind,
        risk_level: RiskLevel,
        description: impl Into<String>,
        identity_id: Option<Uuid>,
        detail: EventDetail,
        client: &ClientMeta,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            description: description.into(),
            identity_id,
            detail,
            client_ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            risk_level,
            created_at: Utc::now(),
        }
    }
}
