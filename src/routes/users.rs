use anyhow::Context;
use axum::{Json, extract::State, response::IntoResponse};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::models::{CreateUserEntity, UserEntity};
use crate::schema::users;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/users",
        OpenApiRouter::new().routes(utoipa_axum::routes!(signup)),
    )
}

#[derive(Deserialize, ToSchema)]
pub struct SignupReq {
    pub email: String,
    pub mobile_number: String,
}

/// Register a new user. Email and mobile number must both be unused.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Users"],
    request_body = SignupReq,
    responses(
        (status = 200, description = "Account created", body = StdResponse<UserEntity, String>),
        (status = 400, description = "Email or mobile number already registered")
    )
)]
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let email = body.email.trim().to_lowercase();
    let mobile = body.mobile_number.trim().to_string();

    let email_taken: Option<i32> = users::table
        .filter(users::username.eq(&email))
        .select(users::id)
        .first(conn)
        .await
        .optional()
        .context("Failed to check email")?;
    if email_taken.is_some() {
        return Err(AppError::BadRequest("Email is already registered".into()));
    }

    let mobile_taken: Option<i32> = users::table
        .filter(users::mobile_number.eq(&mobile))
        .select(users::id)
        .first(conn)
        .await
        .optional()
        .context("Failed to check mobile number")?;
    if mobile_taken.is_some() {
        return Err(AppError::BadRequest(
            "Mobile number is already registered".into(),
        ));
    }

    let user = diesel::insert_into(users::table)
        .values(CreateUserEntity {
            username: email,
            mobile_number: mobile,
        })
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create user")?;

    Ok(StdResponse {
        data: Some(user),
        message: Some("Account created successfully"),
    })
}
