use anyhow::Context;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::domain::status::AppointmentStatus;
use crate::domain::view::mean_rating;
use crate::models::ServiceProviderEntity;
use crate::schema::{appointments, service_providers};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/providers",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_providers))
            .routes(utoipa_axum::routes!(get_provider))
            .routes(utoipa_axum::routes!(get_average_rating)),
    )
}

/// List approved service providers.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Providers"],
    responses(
        (status = 200, description = "List approved providers", body = StdResponse<Vec<ServiceProviderEntity>, String>)
    )
)]
async fn get_providers(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let providers: Vec<ServiceProviderEntity> = service_providers::table
        .filter(service_providers::approved.eq(true))
        .order_by(service_providers::id.asc())
        .get_results(conn)
        .await
        .context("Failed to get providers")?;

    Ok(StdResponse {
        data: Some(providers),
        message: Some("Get providers successfully"),
    })
}

/// Fetch a provider's profile.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Providers"],
    params(
        ("id" = i32, Path, description = "Provider ID to fetch")
    ),
    responses(
        (status = 200, description = "Get provider successfully", body = StdResponse<ServiceProviderEntity, String>),
        (status = 404, description = "Provider not found")
    )
)]
async fn get_provider(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let provider: ServiceProviderEntity = service_providers::table
        .find(id)
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(provider),
        message: Some("Get provider successfully"),
    })
}

#[derive(Serialize, ToSchema)]
pub struct AverageRatingRes {
    pub average_rating: f64,
}

/// Mean rating over the provider's rated, completed appointments; 0.0 when
/// none have been rated yet.
#[utoipa::path(
    get,
    path = "/{id}/average-rating",
    tags = ["Providers"],
    params(
        ("id" = i32, Path, description = "Provider ID to rate")
    ),
    responses(
        (status = 200, description = "Average rating", body = StdResponse<AverageRatingRes, String>),
        (status = 404, description = "Provider not found")
    )
)]
async fn get_average_rating(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    service_providers::table
        .find(id)
        .select(service_providers::id)
        .get_result::<i32>(conn)
        .await?;

    let ratings: Vec<Option<i32>> = appointments::table
        .filter(appointments::provider_id.eq(id))
        .filter(appointments::status.eq(AppointmentStatus::Completed))
        .filter(appointments::rating.is_not_null())
        .select(appointments::rating)
        .get_results(conn)
        .await
        .context("Failed to get ratings")?;

    let ratings: Vec<i32> = ratings.into_iter().flatten().collect();

    Ok(StdResponse {
        data: Some(AverageRatingRes {
            average_rating: mean_rating(&ratings),
        }),
        message: Some("Get average rating successfully"),
    })
}
