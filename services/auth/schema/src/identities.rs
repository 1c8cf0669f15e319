use sea_orm::entity::prelude::*;

/// Durable user record owned by the auth service.
/// Created on first successful signup verification, never deleted here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "identities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Opaque public ID shown to the user ("OS-" + 10 uppercase alphanumerics).
    #[sea_orm(unique)]
    pub public_id: String,
    /// Unique and immutable once set; nullable until the user picks one.
    #[sea_orm(unique)]
    pub username: Option<String>,
    /// Telegram user ID used as the external login handle.
    #[sea_orm(unique)]
    pub telegram_user_id: String,
    pub is_setup_complete: bool,
    pub is_verified: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::one_time_codes::Entity")]
    OneTimeCodes,
    #[sea_orm(has_many = "super::biometric_credentials::Entity")]
    BiometricCredentials,
}

impl Related<super::one_time_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OneTimeCodes.def()
    }
}

impl Related<super::biometric_credentials::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BiometricCredentials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
