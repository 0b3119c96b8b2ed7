use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::status::{AppointmentStatus, CouponStatus};

// Users

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i32,
    pub username: String,
    pub mobile_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct CreateUserEntity {
    pub username: String,
    pub mobile_number: String,
}

// Service providers

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::service_providers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServiceProviderEntity {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Option<String>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

// Gadget types

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::gadget_types)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GadgetTypeEntity {
    pub id: i32,
    pub name: String,
}

// Appointments

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AppointmentEntity {
    pub id: i32,
    pub user_id: i32,
    pub provider_id: i32,
    pub gadget_type_id: i32,
    pub model: Option<String>,
    pub purchase_date: NaiveDate,
    pub problem_description: Option<String>,
    pub preferred_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub cancel_reason: Option<String>,
    pub reschedule_time: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
    pub amount: Option<i32>,
    pub order_id: Option<String>,
    pub payment_id: Option<String>,
    pub payment_status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentEntity {
    /// Review fields are write-once; either one being present means the
    /// appointment has already been reviewed.
    pub fn has_reviewed(&self) -> bool {
        self.rating.is_some() || self.comment.is_some()
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateAppointmentEntity {
    pub user_id: i32,
    pub provider_id: i32,
    pub gadget_type_id: i32,
    pub model: Option<String>,
    pub purchase_date: NaiveDate,
    pub problem_description: Option<String>,
    pub preferred_time: DateTime<Utc>,
    pub status: AppointmentStatus,
}

// Coupons

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CouponEntity {
    pub id: i32,
    pub user_id: i32,
    pub appointment_id: i32,
    pub coupon_code: String,
    pub discount: i32,
    pub expiry_date: DateTime<Utc>,
    pub status: CouponStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateCouponEntity {
    pub user_id: i32,
    pub appointment_id: i32,
    pub coupon_code: String,
    pub discount: i32,
    pub expiry_date: DateTime<Utc>,
    pub status: CouponStatus,
}
