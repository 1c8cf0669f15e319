pub use sea_orm_migration::prelude::*;

mod m20260801_000001_create_identities;
mod m20260801_000002_create_one_time_codes;
mod m20260801_000003_create_passcode_credentials;
mod m20260801_000004_create_biometric_credentials;
mod m20260801_000005_create_security_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_identities::Migration),
            Box::new(m20260801_000002_create_one_time_codes::Migration),
            Box::new(m20260801_000003_create_passcode_credentials::Migration),
            Box::new(m20260801_000004_create_biometric_credentials::Migration),
            Box::new(m20260801_000005_create_security_events::Migration),
        ]
    }
}
