use anyhow::{Context, anyhow};
use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::domain::coupon::{self, CouponPolicy};
use crate::domain::payment::{ConfirmOutcome, classify_confirmation};
use crate::domain::status::{AppointmentStatus, CouponStatus};
use crate::models::{AppointmentEntity, CouponEntity, CreateCouponEntity};
use crate::notify::CouponIssuedEvent;
use crate::schema::{appointments, coupons};

const COUPON_INSERT_ATTEMPTS: usize = 5;
const COUPON_CODE_UNIQUE_CONSTRAINT: &str = "coupons_coupon_code_key";

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new().routes(utoipa_axum::routes!(confirm_payment)),
    )
}

#[derive(Deserialize, ToSchema)]
pub struct ConfirmPaymentReq {
    pub appointment_id: i32,
    pub user_id: i32,
    pub payment_id: String,
    /// Shared secret identifying the trusted payment backend.
    pub provider_secret: String,
}

#[derive(Serialize, ToSchema)]
pub struct ConfirmPaymentRes {
    pub appointment: AppointmentEntity,
    pub coupon: CouponEntity,
}

/// Called by the payment backend once a payment settles. Completes the
/// appointment and mints its coupon in one transaction; a repeat call for an
/// already-completed appointment is a no-op that returns the original coupon.
#[utoipa::path(
    post,
    path = "/confirm",
    tags = ["Payments"],
    request_body = ConfirmPaymentReq,
    responses(
        (status = 200, description = "Payment confirmed and coupon issued", body = StdResponse<ConfirmPaymentRes, String>),
        (status = 400, description = "Appointment is not awaiting payment"),
        (status = 401, description = "Shared secret mismatch"),
        (status = 404, description = "Appointment not found")
    )
)]
async fn confirm_payment(
    State(state): State<AppState>,
    Json(body): Json<ConfirmPaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.provider_secret != state.config.payment.backend_secret {
        return Err(AppError::Unauthorized);
    }

    let mut pooled = state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;
    let conn = &mut *pooled;

    let policy = state.config.coupon.clone();
    let (appointment, coupon, newly_issued) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let appointment: AppointmentEntity = appointments::table
                    .find(body.appointment_id)
                    .for_update()
                    .get_result(conn)
                    .await
                    .map_err(|err| match err {
                        DieselError::NotFound => AppError::NotFound,
                        err => AppError::Other(err.into()),
                    })?;

                if appointment.user_id != body.user_id {
                    return Err(AppError::Validation(
                        "user_id does not match the appointment".into(),
                    ));
                }

                match classify_confirmation(appointment.status, appointment.payment_status) {
                    // Replay of an already-confirmed payment: hand back the
                    // coupon minted on the first call, nothing is written.
                    ConfirmOutcome::Replay => {
                        let coupon: CouponEntity = coupons::table
                            .filter(coupons::appointment_id.eq(appointment.id))
                            .first(conn)
                            .await
                            .context("Completed appointment has no coupon")?;
                        return Ok((appointment, coupon, false));
                    }
                    ConfirmOutcome::Reject => {
                        return Err(AppError::InvalidState(
                            "Appointment is not awaiting payment".into(),
                        ));
                    }
                    ConfirmOutcome::Complete => {}
                }

                let completed = diesel::update(appointments::table.find(appointment.id))
                    .set((
                        appointments::status.eq(AppointmentStatus::Completed),
                        appointments::payment_status.eq(true),
                        appointments::payment_id.eq(&body.payment_id),
                        appointments::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(AppointmentEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to complete appointment")?;

                let coupon =
                    issue_coupon(conn, completed.user_id, completed.id, &policy).await?;

                Ok::<(AppointmentEntity, CouponEntity, bool), AppError>((
                    completed, coupon, true,
                ))
            })
        })
        .await?;

    // Best-effort push, after the commit; the response never waits on
    // delivery and the coupon stays queryable regardless.
    if newly_issued {
        state
            .notifier
            .emit(
                coupon.user_id,
                CouponIssuedEvent {
                    coupon_code: coupon.coupon_code.clone(),
                    expiry_date: coupon.expiry_date.format("%Y-%m-%d").to_string(),
                    discount: coupon.discount,
                },
            )
            .await;
    }

    Ok(StdResponse {
        data: Some(ConfirmPaymentRes { appointment, coupon }),
        message: Some("Payment confirmed and coupon issued"),
    })
}

/// Inserts a coupon, regenerating the code on a uniqueness collision. The
/// generator offers no hard uniqueness guarantee; the store's unique index
/// is the backstop.
async fn issue_coupon(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    appointment_id: i32,
    policy: &CouponPolicy,
) -> Result<CouponEntity, AppError> {
    let expiry_date = coupon::expiry_from(Utc::now(), policy);

    for _ in 0..COUPON_INSERT_ATTEMPTS {
        let (coupon_code, discount) = {
            let mut rng = rand::thread_rng();
            coupon::generate_code(&mut rng, user_id, policy)
        };
        let row = CreateCouponEntity {
            user_id,
            appointment_id,
            coupon_code,
            discount,
            expiry_date,
            status: CouponStatus::Unused,
        };

        // Each attempt gets its own savepoint. A collision would otherwise
        // abort the surrounding transaction and take the completion with it.
        let attempt: Result<CouponEntity, DieselError> = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    diesel::insert_into(coupons::table)
                        .values(row)
                        .returning(CouponEntity::as_returning())
                        .get_result(conn)
                        .await
                })
            })
            .await;

        match attempt {
            Ok(coupon) => return Ok(coupon),
            Err(err) if is_code_collision(&err) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Other(anyhow!(
        "could not generate a unique coupon code after {COUPON_INSERT_ATTEMPTS} attempts"
    )))
}

fn is_code_collision(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name() == Some(COUPON_CODE_UNIQUE_CONSTRAINT)
    )
}
