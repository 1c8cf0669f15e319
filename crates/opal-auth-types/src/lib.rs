//! Session-token types shared between the auth service (sole issuer) and
//! anything that validates Opal session cookies.

pub mod cookie;
pub mod token;
