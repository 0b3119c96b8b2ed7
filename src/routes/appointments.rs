use anyhow::{Context, Result};
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::result::Error as DieselError;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::db::lower;
use crate::domain::status::{
    AppointmentStatus, CANCELLED_BY_USER, CANCELLED_BY_USER_RESCHEDULE,
};
use crate::domain::view::{GroupedAppointments, group_appointments};
use crate::middleware;
use crate::models::{
    AppointmentEntity, CreateAppointmentEntity, GadgetTypeEntity, ServiceProviderEntity,
};
use crate::schema::{appointments, gadget_types, service_providers};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new()
        .nest(
            "/providers",
            OpenApiRouter::new().routes(utoipa_axum::routes!(book_appointment)),
        )
        .nest(
            "/appointments",
            OpenApiRouter::new()
                .routes(utoipa_axum::routes!(get_my_appointments))
                .routes(utoipa_axum::routes!(cancel_appointment))
                .routes(utoipa_axum::routes!(cancel_reschedule))
                .routes(utoipa_axum::routes!(accept_reschedule))
                .routes(utoipa_axum::routes!(submit_review)),
        )
        .route_layer(axum::middleware::from_fn(middleware::users_authorization))
}

#[derive(Deserialize, ToSchema)]
pub struct BookAppointmentReq {
    pub gadget_type: String,
    pub model: Option<String>,
    /// `%Y-%m-%d`
    pub purchase_date: String,
    pub problem_description: Option<String>,
    /// `%Y-%m-%dT%H:%M`
    pub preferred_time: String,
}

/// Book a repair appointment with an approved provider. The gadget type is
/// matched case-insensitively by name.
#[utoipa::path(
    post,
    path = "/{id}/appointments",
    tags = ["Appointments"],
    params(
        ("id" = i32, Path, description = "Provider ID to book with")
    ),
    request_body = BookAppointmentReq,
    responses(
        (status = 200, description = "Appointment booked successfully", body = StdResponse<AppointmentEntity, String>),
        (status = 400, description = "Invalid gadget type or malformed dates"),
        (status = 404, description = "Provider not found or not approved")
    )
)]
async fn book_appointment(
    Path(provider_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<BookAppointmentReq>,
) -> Result<impl IntoResponse, AppError> {
    let mut pooled = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn = &mut *pooled;

    let purchase_date = NaiveDate::parse_from_str(&body.purchase_date, DATE_FORMAT)
        .map_err(|_| AppError::Validation(format!("purchase_date must match {DATE_FORMAT}")))?;
    let preferred_time = NaiveDateTime::parse_from_str(&body.preferred_time, DATETIME_FORMAT)
        .map_err(|_| AppError::Validation(format!("preferred_time must match {DATETIME_FORMAT}")))?
        .and_utc();

    let provider: ServiceProviderEntity = service_providers::table
        .find(provider_id)
        .filter(service_providers::approved.eq(true))
        .get_result(conn)
        .await?;

    let gadget_type: GadgetTypeEntity = gadget_types::table
        .filter(lower(gadget_types::name).eq(body.gadget_type.to_lowercase()))
        .first(conn)
        .await
        .map_err(|err| gadget_lookup_error(err, &body.gadget_type))?;

    let appointment = diesel::insert_into(appointments::table)
        .values(CreateAppointmentEntity {
            user_id,
            provider_id: provider.id,
            gadget_type_id: gadget_type.id,
            model: body.model,
            purchase_date,
            problem_description: body.problem_description,
            preferred_time,
            status: AppointmentStatus::New,
        })
        .returning(AppointmentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create appointment")?;

    Ok(StdResponse {
        data: Some(appointment),
        message: Some("Appointment booked successfully"),
    })
}

/// Fetch the authenticated user's appointments grouped into the user-facing
/// status buckets.
#[utoipa::path(
    get,
    path = "/my",
    tags = ["Appointments"],
    responses(
        (status = 200, description = "Grouped appointments", body = StdResponse<GroupedAppointments, String>)
    )
)]
async fn get_my_appointments(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let mut pooled = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn = &mut *pooled;

    let appointments: Vec<AppointmentEntity> = appointments::table
        .filter(appointments::user_id.eq(user_id))
        .order_by(appointments::created_at.asc())
        .get_results(conn)
        .await
        .context("Failed to get appointments")?;

    Ok(StdResponse {
        data: Some(group_appointments(appointments)),
        message: Some("Get appointments successfully"),
    })
}

/// Loads the caller's appointment under a row lock so a concurrent transition
/// cannot pass its guard from the same stale status.
async fn lock_appointment(
    conn: &mut diesel_async::AsyncPgConnection,
    id: i32,
    user_id: i32,
) -> Result<AppointmentEntity, AppError> {
    appointments::table
        .find(id)
        .filter(appointments::user_id.eq(user_id))
        .for_update()
        .get_result(conn)
        .await
        .map_err(AppError::from)
}

/// Cancel an appointment that the provider has not yet acted on.
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tags = ["Appointments"],
    params(
        ("id" = i32, Path, description = "Appointment ID to cancel")
    ),
    responses(
        (status = 200, description = "Appointment cancelled", body = StdResponse<AppointmentEntity, String>),
        (status = 400, description = "Appointment is not in New or Pending"),
        (status = 404, description = "Appointment not found")
    )
)]
async fn cancel_appointment(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let mut pooled = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn = &mut *pooled;

    let cancelled = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let appointment = lock_appointment(conn, id, user_id).await?;
                if !appointment.status.can_cancel() {
                    return Err(AppError::InvalidState(
                        "Cannot cancel this appointment".into(),
                    ));
                }

                let cancelled = diesel::update(appointments::table.find(id))
                    .set((
                        appointments::status.eq(AppointmentStatus::Cancelled),
                        appointments::cancel_reason.eq(CANCELLED_BY_USER),
                        appointments::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(AppointmentEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to cancel appointment")?;

                Ok::<AppointmentEntity, AppError>(cancelled)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(cancelled),
        message: Some("Appointment cancelled"),
    })
}

/// Cancel an appointment the provider has proposed to reschedule.
#[utoipa::path(
    post,
    path = "/{id}/cancel-reschedule",
    tags = ["Appointments"],
    params(
        ("id" = i32, Path, description = "Appointment ID to cancel")
    ),
    responses(
        (status = 200, description = "Rescheduled appointment cancelled", body = StdResponse<AppointmentEntity, String>),
        (status = 400, description = "Appointment is not in Rescheduled"),
        (status = 404, description = "Appointment not found")
    )
)]
async fn cancel_reschedule(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let mut pooled = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn = &mut *pooled;

    let cancelled = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let appointment = lock_appointment(conn, id, user_id).await?;
                if !appointment.status.can_cancel_reschedule() {
                    return Err(AppError::InvalidState(
                        "Only rescheduled appointments can be cancelled".into(),
                    ));
                }

                let cancelled = diesel::update(appointments::table.find(id))
                    .set((
                        appointments::status.eq(AppointmentStatus::Cancelled),
                        appointments::cancel_reason.eq(CANCELLED_BY_USER_RESCHEDULE),
                        appointments::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(AppointmentEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to cancel rescheduled appointment")?;

                Ok::<AppointmentEntity, AppError>(cancelled)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(cancelled),
        message: Some("Rescheduled appointment cancelled"),
    })
}

/// Accept the provider's proposed reschedule time, moving the appointment
/// back into the pending bucket.
#[utoipa::path(
    post,
    path = "/{id}/accept-reschedule",
    tags = ["Appointments"],
    params(
        ("id" = i32, Path, description = "Appointment ID to accept")
    ),
    responses(
        (status = 200, description = "Reschedule accepted", body = StdResponse<AppointmentEntity, String>),
        (status = 400, description = "Appointment is not in Rescheduled or has no reschedule time"),
        (status = 404, description = "Appointment not found")
    )
)]
async fn accept_reschedule(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let mut pooled = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn = &mut *pooled;

    let accepted = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let appointment = lock_appointment(conn, id, user_id).await?;
                if !appointment.status.can_accept_reschedule() {
                    return Err(AppError::InvalidState(
                        "Only rescheduled appointments can be accepted".into(),
                    ));
                }
                if appointment.reschedule_time.is_none() {
                    return Err(AppError::Validation("Reschedule time is not set".into()));
                }

                let accepted = diesel::update(appointments::table.find(id))
                    .set((
                        appointments::status.eq(AppointmentStatus::PendingRescheduled),
                        appointments::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(AppointmentEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to accept reschedule")?;

                Ok::<AppointmentEntity, AppError>(accepted)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(accepted),
        message: Some("Rescheduled appointment accepted and moved to pending"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitReviewReq {
    pub rating: i32,
    pub comment: Option<String>,
}

/// Leave a one-time rating and optional comment on a completed appointment.
#[utoipa::path(
    post,
    path = "/{id}/review",
    tags = ["Appointments"],
    params(
        ("id" = i32, Path, description = "Appointment ID to review")
    ),
    request_body = SubmitReviewReq,
    responses(
        (status = 200, description = "Review submitted", body = StdResponse<AppointmentEntity, String>),
        (status = 400, description = "Appointment not completed, already reviewed, or rating out of range"),
        (status = 404, description = "Appointment not found")
    )
)]
async fn submit_review(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<SubmitReviewReq>,
) -> Result<impl IntoResponse, AppError> {
    let mut pooled = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn = &mut *pooled;

    if !(1..=5).contains(&body.rating) {
        return Err(AppError::Validation(
            "Rating must be an integer between 1 and 5".into(),
        ));
    }

    let reviewed = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let appointment = lock_appointment(conn, id, user_id).await?;
                if appointment.status != AppointmentStatus::Completed {
                    return Err(AppError::InvalidState(
                        "Only completed appointments can be reviewed".into(),
                    ));
                }
                if appointment.has_reviewed() {
                    return Err(AppError::InvalidState(
                        "Appointment has already been reviewed".into(),
                    ));
                }

                let reviewed = diesel::update(appointments::table.find(id))
                    .set((
                        appointments::rating.eq(body.rating),
                        appointments::comment.eq(body.comment),
                        appointments::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(AppointmentEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to submit review")?;

                Ok::<AppointmentEntity, AppError>(reviewed)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(reviewed),
        message: Some("Review submitted successfully"),
    })
}

/// An unknown gadget type is the caller's mistake; any other store failure
/// stays an internal error.
fn gadget_lookup_error(err: DieselError, gadget_type: &str) -> AppError {
    match err {
        DieselError::NotFound => {
            AppError::Validation(format!("{gadget_type} is not a valid gadget type"))
        }
        err => AppError::Other(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_gadget_type_is_a_validation_error() {
        let err = gadget_lookup_error(DieselError::NotFound, "Toaster");
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn gadget_lookup_infrastructure_failures_stay_internal() {
        let err = gadget_lookup_error(DieselError::BrokenTransactionManager, "Phone");
        assert_eq!(err.kind(), "internal_error");
    }
}
