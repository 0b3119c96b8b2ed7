use anyhow::Context;
use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::middleware;
use crate::models::CouponEntity;
use crate::schema::coupons;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/coupons",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_coupons))
            .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
    )
}

#[derive(Serialize, ToSchema)]
pub struct CouponView {
    pub coupon: CouponEntity,
    /// Evaluated lazily at read time; expired coupons are never swept.
    pub expired: bool,
}

/// List the authenticated user's coupons, newest first.
#[utoipa::path(
    get,
    path = "/my",
    tags = ["Coupons"],
    responses(
        (status = 200, description = "List my coupons", body = StdResponse<Vec<CouponView>, String>)
    )
)]
async fn get_my_coupons(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let coupons: Vec<CouponEntity> = coupons::table
        .filter(coupons::user_id.eq(user_id))
        .order_by(coupons::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get coupons")?;

    let now = Utc::now();
    let coupons = coupons
        .into_iter()
        .map(|coupon| CouponView {
            expired: coupon.expiry_date < now,
            coupon,
        })
        .collect::<Vec<_>>();

    Ok(StdResponse {
        data: Some(coupons),
        message: Some("Get coupons successfully"),
    })
}
