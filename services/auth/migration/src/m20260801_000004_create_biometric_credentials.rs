use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BiometricCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BiometricCredentials::CredentialId)
                            .binary()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BiometricCredentials::IdentityId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BiometricCredentials::Credential)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BiometricCredentials::DeviceName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BiometricCredentials::DeviceClass)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BiometricCredentials::IsActive)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BiometricCredentials::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BiometricCredentials::LastUsedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(BiometricCredentials::Table, BiometricCredentials::IdentityId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(BiometricCredentials::Table)
                    .col(BiometricCredentials::IdentityId)
                    .name("idx_biometric_credentials_identity_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BiometricCredentials::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BiometricCredentials {
    Table,
    CredentialId,
    IdentityId,
    Credential,
    DeviceName,
    DeviceClass,
    IsActive,
    CreatedAt,
    LastUsedAt,
}

#[derive(Iden)]
enum Identities {
    Table,
    Id,
}
