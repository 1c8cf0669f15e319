use std::sync::Arc;

use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;
use webauthn_rs::Webauthn;

use crate::infra::cache::{RedisChallengeCache, RedisRateLimiter};
use crate::infra::db::{
    DbAuditRepository, DbBiometricRepository, DbIdentityRepository, DbOtpRepository,
    DbPasscodeRepository,
};
use crate::infra::telegram::TelegramMessenger;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub webauthn: Arc<Webauthn>,
    pub session_secret: String,
    pub cookie_domain: String,
    pub messenger: TelegramMessenger,
}

impl AppState {
    pub fn identity_repo(&self) -> DbIdentityRepository {
        DbIdentityRepository {
            db: self.db.clone(),
        }
    }

    pub fn otp_repo(&self) -> DbOtpRepository {
        DbOtpRepository {
            db: self.db.clone(),
        }
    }

    pub fn passcode_repo(&self) -> DbPasscodeRepository {
        DbPasscodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn biometric_repo(&self) -> DbBiometricRepository {
        DbBiometricRepository {
            db: self.db.clone(),
        }
    }

    pub fn audit_repo(&self) -> DbAuditRepository {
        DbAuditRepository {
            db: self.db.clone(),
        }
    }

    pub fn challenge_cache(&self) -> RedisChallengeCache {
        RedisChallengeCache {
            pool: self.redis.clone(),
        }
    }

    pub fn rate_limiter(&self) -> RedisRateLimiter {
        RedisRateLimiter {
            pool: self.redis.clone(),
        }
    }
}
