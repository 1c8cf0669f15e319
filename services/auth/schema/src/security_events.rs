use sea_orm::entity::prelude::*;

/// Append-only security audit record. Never updated or deleted by the
/// application.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "security_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Closed event-kind enumeration, stored as its snake_case name.
    pub kind: String,
    pub description: String,
    pub identity_id: Option<Uuid>,
    /// Tagged per-kind payload (shape fixed per event kind).
    pub detail: Json,
    pub client_ip: String,
    pub user_agent: String,
    /// "low", "medium", "high" or "critical".
    pub risk_level: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
