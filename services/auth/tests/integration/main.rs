mod helpers;

mod otp_test;
mod passcode_test;
