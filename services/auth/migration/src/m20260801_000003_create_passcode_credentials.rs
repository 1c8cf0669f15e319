use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PasscodeCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PasscodeCredentials::IdentityId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PasscodeCredentials::PasscodeHash)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasscodeCredentials::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(PasscodeCredentials::Table, PasscodeCredentials::IdentityId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PasscodeCredentials::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PasscodeCredentials {
    Table,
    IdentityId,
    PasscodeHash,
    UpdatedAt,
}

#[derive(Iden)]
enum Identities {
    Table,
    Id,
}
