use anyhow::Context;
use axum::{Json, extract::State, response::IntoResponse};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::schema::users;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/auth/otp",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(request_otp))
            .routes(utoipa_axum::routes!(verify_otp)),
    )
}

#[derive(Deserialize, ToSchema)]
pub struct RequestOtpReq {
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct RequestOtpRes {
    pub exists: bool,
}

/// Issue a one-time code for a registered email. Delivery happens outside
/// this service; the code is only logged here.
#[utoipa::path(
    post,
    path = "/request",
    tags = ["Auth"],
    request_body = RequestOtpReq,
    responses(
        (status = 200, description = "OTP issued when the email is registered", body = StdResponse<RequestOtpRes, String>)
    )
)]
async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<RequestOtpReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let email = body.email.trim().to_lowercase();
    let user: Option<i32> = users::table
        .filter(users::username.eq(&email))
        .select(users::id)
        .first(conn)
        .await
        .optional()
        .context("Failed to look up user")?;

    let exists = user.is_some();
    if exists {
        let code = state.otp_store.issue(&email).await;
        // stand-in for the mail/SMS hand-off, which is out of scope
        tracing::info!(%email, otp_len = code.len(), "issued verification code");
    }

    Ok(StdResponse {
        data: Some(RequestOtpRes { exists }),
        message: Some("OTP request processed"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyOtpReq {
    pub email: String,
    pub otp: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyOtpRes {
    pub success: bool,
}

/// Verify and consume a one-time code. A code verifies at most once and
/// expires two minutes after issuance (configurable).
#[utoipa::path(
    post,
    path = "/verify",
    tags = ["Auth"],
    request_body = VerifyOtpReq,
    responses(
        (status = 200, description = "Verification outcome", body = StdResponse<VerifyOtpRes, String>)
    )
)]
async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpReq>,
) -> Result<impl IntoResponse, AppError> {
    let email = body.email.trim().to_lowercase();
    let success = state.otp_store.verify(&email, &body.otp).await;

    Ok(StdResponse {
        data: Some(VerifyOtpRes { success }),
        message: Some("OTP verification processed"),
    })
}
