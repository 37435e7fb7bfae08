#[cfg(test)]
use axum_test::TestServer;
#[cfg(test)]
use sea_orm::{Database, DatabaseConnection};
#[cfg(test)]
use sea_orm_migration::MigratorTrait;

#[cfg(test)]
use crate::db;
#[cfg(test)]
use crate::server::{self, api::ApiState};

#[cfg(test)]
pub async fn get_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db::migration::Migrator::refresh(&db).await.unwrap();
    db
}

#[cfg(test)]
pub async fn get_test_api() -> (TestServer, DatabaseConnection) {
    let db = get_test_db().await;
    let state = ApiState {
        db: db.clone(),
        auth: "test".into(),
    };
    let server = TestServer::new(server::router(state)).unwrap();
    (server, db)
}
