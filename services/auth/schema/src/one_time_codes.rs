use sea_orm::entity::prelude::*;

/// One-time numeric code sent to a user via Telegram.
/// Keyed by `(identifier, purpose)` — at most one live code per key;
/// re-issuing replaces the row and resets the attempt counter.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "one_time_codes")]
pub struct Model {
    /// External login handle the code was issued for (Telegram user ID).
    #[sea_orm(primary_key, auto_increment = false)]
    pub identifier: String,
    /// "signup" or "login".
    #[sea_orm(primary_key, auto_increment = false)]
    pub purpose: String,
    pub code: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    /// Failed verification attempts against this code (cap 5).
    pub attempts: i32,
    pub consumed: bool,
    /// Linked identity; null for signup codes until the identity exists.
    pub identity_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
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
