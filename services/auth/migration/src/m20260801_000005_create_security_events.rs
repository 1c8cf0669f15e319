use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only: no update path exists in the service, and no down
        // migration ever rewrites rows.
        manager
            .create_table(
                Table::create()
                    .table(SecurityEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SecurityEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SecurityEvents::Kind).string().not_null())
                    .col(
                        ColumnDef::new(SecurityEvents::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SecurityEvents::IdentityId).uuid())
                    .col(ColumnDef::new(SecurityEvents::Detail).json().not_null())
                    .col(ColumnDef::new(SecurityEvents::ClientIp).string().not_null())
                    .col(
                        ColumnDef::new(SecurityEvents::UserAgent)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SecurityEvents::RiskLevel)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SecurityEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SecurityEvents::Table)
                    .col(SecurityEvents::IdentityId)
                    .name("idx_security_events_identity_id")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SecurityEvents::Table)
                    .col(SecurityEvents::CreatedAt)
                    .name("idx_security_events_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SecurityEvents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SecurityEvents {
    Table,
    Id,
    Kind,
    Description,
    IdentityId,
    Detail,
    ClientIp,
    UserAgent,
    RiskLevel,
    CreatedAt,
}
