pub mod flow;
pub mod otp;
pub mod passcode;
pub mod passkey;
pub mod session;
