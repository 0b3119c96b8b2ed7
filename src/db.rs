use anyhow::{Context, Result, anyhow};
use diesel::{Connection, PgConnection};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};

pub type DbPool = Pool<AsyncPgConnection>;

diesel::define_sql_function! {
    /// Postgres `lower()`, used for case-insensitive lookups.
    fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

pub async fn create_pool(url: &str) -> Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(url);
    Pool::builder()
        .build(manager)
        .await
        .context("Failed to build database connection pool")
}

/// Runs embedded migrations on a dedicated blocking thread; diesel's
/// migration harness only speaks the synchronous connection.
pub async fn run_migrations_blocking(migrations: EmbeddedMigrations, url: &str) -> Result<usize> {
    let url = url.to_string();
    tokio::task::spawn_blocking(move || -> Result<usize> {
        let mut conn =
            PgConnection::establish(&url).context("Failed to connect for migrations")?;
        let versions = conn
            .run_pending_migrations(migrations)
            .map_err(|err| anyhow!("Failed to run migrations: {err}"))?;
        Ok(versions.len())
    })
    .await
    .context("Migration task panicked")?
}
