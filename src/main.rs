use anyhow::Result;
use axum::Router;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use repairhub_bookingservice::{app_state::AppState, bootstrap, config, db, routes, swagger};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let routes = routes::users::routes_with_openapi()
        .merge(routes::auth::routes_with_openapi())
        .merge(routes::providers::routes_with_openapi())
        .merge(routes::appointments::routes_with_openapi())
        .merge(routes::payments::routes_with_openapi())
        .merge(routes::coupons::routes_with_openapi());

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("RepairHub BookingService API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi)?;

    let app = Router::new()
        .merge(routes)
        .merge(routes::notifications::routes())
        .merge(swagger_ui);

    tracing::info!("Running migrations...");
    let config = config::load()?;
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    tracing::info!("Bootstrapping...");
    let state = AppState::init(config).await?;
    bootstrap::bootstrap("BookingService", app, state).await?;
    Ok(())
}
