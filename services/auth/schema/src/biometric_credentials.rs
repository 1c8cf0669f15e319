use sea_orm::entity::prelude::*;

/// WebAuthn credential registered for an identity. Soft-deleted on removal
/// (`is_active = false`); at most 5 active rows per identity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "biometric_credentials")]
pub struct Model {
    /// Raw credential ID bytes, as issued by the authenticator.
    #[sea_orm(primary_key, auto_increment = false)]
    pub credential_id: Vec<u8>,
    pub identity_id: Uuid,
    /// JSON-serialized `webauthn_rs::Passkey` (counter updates are persisted here).
    pub credential: Vec<u8>,
    /// Friendly device name chosen at registration.
    pub device_name: String,
    /// "fingerprint", "face" or "unknown".
    pub device_class: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::identities::Entity",
        from = "Column::IdentityId",
        to = "super::identities::Column::Id"
    )]
    Identity,
}

impl Related<super::identities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Identity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
