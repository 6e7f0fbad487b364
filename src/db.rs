use rocket_db_pools::{Database, sqlx};
use rocket_db_pools::sqlx::PgPool;

#[derive(Database)]
#[database("carqr_db")]
pub struct CarQrDb(sqlx::PgPool);

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations. Idempotent; runs at ignition before the server
/// accepts traffic, and against every disposable test database.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}
