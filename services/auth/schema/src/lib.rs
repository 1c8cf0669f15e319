//! sea-orm entities for the auth service tables.

pub mod biometric_credentials;
pub mod identities;
pub mod one_time_codes;
pub mod passcode_credentials;
pub mod security_events;
