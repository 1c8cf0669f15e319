use anyhow::Context as _;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait,
};
use uuid::Uuid;

use opal_auth_schema::{
    biometric_credentials, identities, one_time_codes, passcode_credentials, security_events,
};

use crate::domain::audit::SecurityEvent;
use crate::domain::repository::{
    AuditRepository, BiometricRepository, IdentityRepository, OtpRepository, PasscodeRepository,
};
use crate::domain::types::{
    BiometricCredential, DeviceClass, Identity, OneTimeCode, PasscodeCredential, Purpose,
};
use crate::error::AuthServiceError;

// ── Identity repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbIdentityRepository {
    pub db: DatabaseConnection,
}

impl IdentityRepository for DbIdentityRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthServiceError> {
        let model = identities::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find identity by id")?;
        Ok(model.map(identity_from_model))
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>, AuthServiceError> {
        let model = identities::Entity::find()
            .filter(identities::Column::TelegramUserId.eq(handle))
            .one(&self.db)
            .await
            .context("find identity by handle")?;
        Ok(model.map(identity_from_model))
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Identity>, AuthServiceError> {
        let model = identities::Entity::find()
            .filter(identities::Column::Username.eq(username))
            .one(&self.db)
            .await
            .context("find identity by username")?;
        Ok(model.map(identity_from_model))
    }

    async fn create(&self, identity: &Identity) -> Result<(), AuthServiceError> {
        identities::ActiveModel {
            id: Set(identity.id),
            public_id: Set(identity.public_id.clone()),
            username: Set(identity.username.clone()),
            telegram_user_id: Set(identity.telegram_user_id.clone()),
            is_setup_complete: Set(identity.is_setup_complete),
            is_verified: Set(identity.is_verified),
            created_at: Set(identity.created_at),
            last_login_at: Set(identity.last_login_at),
        }
        .insert(&self.db)
        .await
        .context("create identity")?;
        Ok(())
    }

    async fn mark_login(&self, id: Uuid) -> Result<(), AuthServiceError> {
        identities::ActiveModel {
            id: Set(id),
            last_login_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("mark identity login")?;
        Ok(())
    }

    async fn set_setup_complete(&self, id: Uuid) -> Result<(), AuthServiceError> {
        identities::ActiveModel {
            id: Set(id),
            is_setup_complete: Set(true),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("set identity setup complete")?;
        Ok(())
    }
}

fn identity_from_model(model: identities::Model) -> Identity {
    Identity {
        id: model.id,
        public_id: model.public_id,
        username: model.username,
        telegram_user_id: model.telegram_user_id,
        is_setup_complete: model.is_setup_complete,
        is_verified: model.is_verified,
        created_at: model.created_at,
        last_login_at: model.last_login_at,
    }
}

// ── OTP repository ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOtpRepository {
    pub db: DatabaseConnection,
}

impl OtpRepository for DbOtpRepository {
    async fn find(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<Option<OneTimeCode>, AuthServiceError> {
        let model = one_time_codes::Entity::find_by_id((
            identifier.to_owned(),
            purpose.as_str().to_owned(),
        ))
        .one(&self.db)
        .await
        .context("find one-time code")?;
        Ok(model.map(otp_from_model))
    }

    async fn put_reset(&self, code: &OneTimeCode) -> Result<(), AuthServiceError> {
        // Explicit delete-then-insert in one transaction: the attempt-counter
        // reset is part of the write, not a side effect of upsert semantics.
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let code = code.clone();
                Box::pin(async move {
                    delete_code(txn, &code.identifier, code.purpose).await?;
                    insert_code(txn, &code).await?;
                    Ok(())
                })
            })
            .await
            .context("put one-time code with reset")?;
        Ok(())
    }

    async fn increment_attempts(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<(), AuthServiceError> {
        let model = one_time_codes::Entity::find_by_id((
            identifier.to_owned(),
            purpose.as_str().to_owned(),
        ))
        .one(&self.db)
        .await
        .context("load code for attempt increment")?;
        if let Some(model) = model {
            let attempts = model.attempts + 1;
            let mut active: one_time_codes::ActiveModel = model.into();
            active.attempts = Set(attempts);
            active
                .update(&self.db)
                .await
                .context("increment code attempts")?;
        }
        Ok(())
    }

    async fn mark_consumed(
        &self,
        identifier: &str,
        purpose: Purpose,
    ) -> Result<(), AuthServiceError> {
        let model = one_time_codes::Entity::find_by_id((
            identifier.to_owned(),
            purpose.as_str().to_owned(),
        ))
        .one(&self.db)
        .await
        .context("load code for consumption")?;
        if let Some(model) = model {
            let mut active: one_time_codes::ActiveModel = model.into();
            active.consumed = Set(true);
            active
                .update(&self.db)
                .await
                .context("mark code consumed")?;
        }
        Ok(())
    }
}

async fn delete_code(
    txn: &DatabaseTransaction,
    identifier: &str,
    purpose: Purpose,
) -> Result<(), sea_orm::DbErr> {
    one_time_codes::Entity::delete_many()
        .filter(one_time_codes::Column::Identifier.eq(identifier))
        .filter(one_time_codes::Column::Purpose.eq(purpose.as_str()))
        .exec(txn)
        .await?;
    Ok(())
}

async fn insert_code(txn: &DatabaseTransaction, code: &OneTimeCode) -> Result<(), sea_orm::DbErr> {
    one_time_codes::ActiveModel {
        identifier: Set(code.identifier.clone()),
        purpose: Set(code.purpose.as_str().to_owned()),
        code: Set(code.code.clone()),
        expires_at: Set(code.expires_at),
        attempts: Set(code.attempts),
        consumed: Set(code.consumed),
        identity_id: Set(code.identity_id),
        created_at: Set(code.created_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn otp_from_model(model: one_time_codes::Model) -> OneTimeCode {
    OneTimeCode {
        identifier: model.identifier,
        // Unknown purpose strings cannot exist — writes go through Purpose.
        purpose: Purpose::parse(&model.purpose).unwrap_or(Purpose::Login),
        code: model.code,
        expires_at: model.expires_at,
        attempts: model.attempts,
        consumed: model.consumed,
        identity_id: model.identity_id,
        created_at: model.created_at,
    }
}

// ── Passcode repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbPasscodeRepository {
    pub db: DatabaseConnection,
}

impl PasscodeRepository for DbPasscodeRepository {
    async fn find_by_identity(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<PasscodeCredential>, AuthServiceError> {
        let model = passcode_credentials::Entity::find_by_id(identity_id)
            .one(&self.db)
            .await
            .context("find passcode credential")?;
        Ok(model.map(|m| PasscodeCredential {
            identity_id: m.identity_id,
            passcode_hash: m.passcode_hash,
            updated_at: m.updated_at,
        }))
    }

    async fn upsert(&self, credential: &PasscodeCredential) -> Result<(), AuthServiceError> {
        // Replace, never append: one credential row per identity.
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let credential = credential.clone();
                Box::pin(async move {
                    passcode_credentials::Entity::delete_by_id(credential.identity_id)
                        .exec(txn)
                        .await?;
                    passcode_credentials::ActiveModel {
                        identity_id: Set(credential.identity_id),
                        passcode_hash: Set(credential.passcode_hash.clone()),
                        updated_at: Set(credential.updated_at),
                    }
                    .insert(txn)
                    .await?;
                    Ok(())
                })
            })
            .await
            .context("upsert passcode credential")?;
        Ok(())
    }
}

// ── Biometric repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbBiometricRepository {
    pub db: DatabaseConnection,
}

impl BiometricRepository for DbBiometricRepository {
    async fn list_active(
        &self,
        identity_id: Uuid,
    ) -> Result<Vec<BiometricCredential>, AuthServiceError> {
        let models = biometric_credentials::Entity::find()
            .filter(biometric_credentials::Column::IdentityId.eq(identity_id))
            .filter(biometric_credentials::Column::IsActive.eq(true))
            .all(&self.db)
            .await
            .context("list active biometric credentials")?;
        Ok(models.into_iter().map(biometric_from_model).collect())
    }

    async fn count_active(&self, identity_id: Uuid) -> Result<u64, AuthServiceError> {
        let count = biometric_credentials::Entity::find()
            .filter(biometric_credentials::Column::IdentityId.eq(identity_id))
            .filter(biometric_credentials::Column::IsActive.eq(true))
            .count(&self.db)
            .await
            .context("count active biometric credentials")?;
        Ok(count)
    }

    async fn create(&self, credential: &BiometricCredential) -> Result<(), AuthServiceError> {
        biometric_credentials::ActiveModel {
            credential_id: Set(credential.credential_id.clone()),
            identity_id: Set(credential.identity_id),
            credential: Set(credential.credential.clone()),
            device_name: Set(credential.device_name.clone()),
            device_class: Set(credential.device_class.as_str().to_owned()),
            is_active: Set(credential.is_active),
            created_at: Set(credential.created_at),
            last_used_at: Set(credential.last_used_at),
        }
        .insert(&self.db)
        .await
        .context("create biometric credential")?;
        Ok(())
    }

    async fn deactivate(
        &self,
        credential_id: &[u8],
        identity_id: Uuid,
    ) -> Result<bool, AuthServiceError> {
        let result = biometric_credentials::Entity::update_many()
            .col_expr(
                biometric_credentials::Column::IsActive,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(biometric_credentials::Column::CredentialId.eq(credential_id.to_vec()))
            .filter(biometric_credentials::Column::IdentityId.eq(identity_id))
            .filter(biometric_credentials::Column::IsActive.eq(true))
            .exec(&self.db)
            .await
            .context("deactivate biometric credential")?;
        Ok(result.rows_affected > 0)
    }

    async fn update_credential(
        &self,
        credential_id: &[u8],
        credential: &[u8],
    ) -> Result<(), AuthServiceError> {
        biometric_credentials::ActiveModel {
            credential_id: Set(credential_id.to_vec()),
            credential: Set(credential.to_vec()),
            last_used_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("update biometric credential")?;
        Ok(())
    }
}

fn biometric_from_model(model: biometric_credentials::Model) -> BiometricCredential {
    BiometricCredential {
        credential_id: model.credential_id,
        identity_id: model.identity_id,
        credential: model.credential,
        device_name: model.device_name,
        device_class: DeviceClass::parse(&model.device_class),
        is_active: model.is_active,
        created_at: model.created_at,
        last_used_at: model.last_used_at,
    }
}

// ── Audit repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAuditRepository {
    pub db: DatabaseConnection,
}

impl AuditRepository for DbAuditRepository {
    async fn append(&self, event: &SecurityEvent) -> Result<(), AuthServiceError> {
        let detail =
            serde_json::to_value(&event.detail).map_err(|e| AuthServiceError::Internal(e.into()))?;
        security_events::ActiveModel {
            id: Set(event.id),
            kind: Set(event.kind.as_str().to_owned()),
            description: Set(event.description.clone()),
            identity_id: Set(event.identity_id),
            detail: Set(detail),
            client_ip: Set(event.client_ip.clone()),
            user_agent: Set(event.user_agent.clone()),
            risk_level: Set(event.risk_level.as_str().to_owned()),
            created_at: Set(event.created_at),
        }
        .insert(&self.db)
        .await
        .context("append security event")?;
        Ok(())
    }
}
