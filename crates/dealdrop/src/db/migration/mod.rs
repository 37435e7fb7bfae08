use sea_orm::DatabaseConnection;
pub use sea_orm_migration::prelude::*;

use crate::error::Result;

mod m20260301_000001_create_coupon;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260301_000001_create_coupon::Migration)]
    }
}

pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None).await?;
    Ok(())
}
