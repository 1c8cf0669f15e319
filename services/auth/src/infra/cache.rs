use deadpool_redis::Pool;
use deadpool_redis::redis::AsyncCommands;
use uuid::Uuid;

use crate::domain::repository::{ChallengeCache, RateLimiter};
use crate::domain::types::{CHALLENGE_TTL_SECS, RateDecision};
use crate::error::AuthServiceError;

fn reg_state_key(identity_id: Uuid, ceremony_id: &str) -> String {
    format!("biometric_reg:{identity_id}:{ceremony_id}")
}

fn assert_state_key(username: &str, ceremony_id: &str) -> String {
    format!("biometric_auth:{username}:{ceremony_id}")
}

/// WebAuthn ceremony states in Redis. Values are the serialized
/// `webauthn_rs` state blobs; `get_del` makes every take consuming.
#[derive(Clone)]
pub struct RedisChallengeCache {
    pub pool: Pool,
}

impl ChallengeCache for RedisChallengeCache {
    async fn set_registration_state(
        &self,
        identity_id: Uuid,
        ceremony_id: &str,
        state_json: &[u8],
    ) -> Result<(), AuthServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AuthServiceError::Internal(e.into()))?;
        let key = reg_state_key(identity_id, ceremony_id);
        let (): () = conn
            .set_ex(&key, state_json.to_vec(), CHALLENGE_TTL_SECS)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| AuthServiceError::Internal(e.into()))?;
        Ok(())
    }

    async fn take_registration_state(
        &self,
        identity_id: Uuid,
        ceremony_id: &str,
    ) -> Result<Option<Vec<u8>>, AuthServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AuthServiceError::Internal(e.into()))?;
        let key = reg_state_key(identity_id, ceremony_id);
        let value: Option<Vec<u8>> = conn
            .get_del(&key)
            .await
            .map_err(|e| AuthServiceError::Internal(e.into()))?;
        Ok(value)
    }

    async fn set_assertion_state(
        &self,
        username: &str,
        ceremony_id: &str,
        state_json: &[u8],
    ) -> Result<(), AuthServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AuthServiceError::Internal(e.into()))?;
        let key = assert_state_key(username, ceremony_id);
        let (): () = conn
            .set_ex(&key, state_json.to_vec(), CHALLENGE_TTL_SECS)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| AuthServiceError::Internal(e.into()))?;
        Ok(())
    }

    async fn take_assertion_state(
        &self,
        username: &str,
        ceremony_id: &str,
    ) -> Result<Option<Vec<u8>>, AuthServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AuthServiceError::Internal(e.into()))?;
        let key = assert_state_key(username, ceremony_id);
        let value: Option<Vec<u8>> = conn
            .get_del(&key)
            .await
            .map_err(|e| AuthServiceError::Internal(e.into()))?;
        Ok(value)
    }
}

/// Decision for the `count`-th attempt within a window.
pub fn window_decision(count: u64, max_attempts: u32) -> RateDecision {
    RateDecision {
        allowed: count <= u64::from(max_attempts),
        remaining: u64::from(max_attempts).saturating_sub(count) as u32,
    }
}

/// Fixed-window counter in Redis: INCR the key, set the expiry when the
/// increment opened the window. INCR is atomic, so concurrent attempts for
/// the same key each get a distinct count.
#[derive(Clone)]
pub struct RedisRateLimiter {
    pub pool: Pool,
}

impl RateLimiter for RedisRateLimiter {
    async fn allow(
        &self,
        key: &str,
        max_attempts: u32,
        window_secs: u64,
    ) -> Result<RateDecision, AuthServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AuthServiceError::Internal(e.into()))?;
        let key = format!("rate:{key}");
        let count: u64 = conn
            .incr(&key, 1u64)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| AuthServiceError::Internal(e.into()))?;
        if count == 1 {
            let (): () = conn
                .expire(&key, window_secs as i64)
                .await
                .map_err(|e: deadpool_redis::redis::RedisError| {
                    AuthServiceError::Internal(e.into())
                })?;
        }
        Ok(window_decision(count, max_attempts))
    }
}
