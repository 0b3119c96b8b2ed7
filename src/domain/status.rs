use std::io::Write;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const CANCELLED_BY_USER: &str = "Cancelled by user";
pub const CANCELLED_BY_USER_RESCHEDULE: &str = "Cancelled by user (reschedule)";

/// Closed set of appointment lifecycle states. Stored as text in Postgres;
/// unrecognized stored values are rejected when the row is read back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow, Serialize, Deserialize, ToSchema,
)]
#[diesel(sql_type = Text)]
pub enum AppointmentStatus {
    New,
    Pending,
    #[serde(rename = "Pending_Rescheduled")]
    PendingRescheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::New => "New",
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::PendingRescheduled => "Pending_Rescheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Rescheduled => "Rescheduled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "New" => Some(AppointmentStatus::New),
            "Pending" => Some(AppointmentStatus::Pending),
            "Pending_Rescheduled" => Some(AppointmentStatus::PendingRescheduled),
            "Completed" => Some(AppointmentStatus::Completed),
            "Cancelled" => Some(AppointmentStatus::Cancelled),
            "Rescheduled" => Some(AppointmentStatus::Rescheduled),
            _ => None,
        }
    }

    /// A plain user cancel is only legal before the provider has done any
    /// reschedule work on the appointment.
    pub fn can_cancel(self) -> bool {
        matches!(self, AppointmentStatus::New | AppointmentStatus::Pending)
    }

    pub fn can_cancel_reschedule(self) -> bool {
        self == AppointmentStatus::Rescheduled
    }

    pub fn can_accept_reschedule(self) -> bool {
        self == AppointmentStatus::Rescheduled
    }

    pub fn can_confirm_payment(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::PendingRescheduled
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

impl ToSql<Text, Pg> for AppointmentStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for AppointmentStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let s = std::str::from_utf8(bytes.as_bytes())?;
        Self::parse(s).ok_or_else(|| format!("unrecognized appointment status: {s}").into())
    }
}

/// Coupon redemption state. Redemption itself happens outside this service;
/// coupons are only ever written as `Unused` here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow, Serialize, Deserialize, ToSchema,
)]
#[diesel(sql_type = Text)]
pub enum CouponStatus {
    #[serde(rename = "unused")]
    Unused,
    #[serde(rename = "used")]
    Used,
}

impl CouponStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CouponStatus::Unused => "unused",
            CouponStatus::Used => "used",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unused" => Some(CouponStatus::Unused),
            "used" => Some(CouponStatus::Used),
            _ => None,
        }
    }
}

impl ToSql<Text, Pg> for CouponStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for CouponStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let s = std::str::from_utf8(bytes.as_bytes())?;
        Self::parse(s).ok_or_else(|| format!("unrecognized coupon status: {s}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::New,
        AppointmentStatus::Pending,
        AppointmentStatus::PendingRescheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Rescheduled,
    ];

    #[test]
    fn parse_round_trips_every_status() {
        for status in ALL {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert_eq!(AppointmentStatus::parse("Rejected"), None);
        assert_eq!(AppointmentStatus::parse("pending"), None);
        assert_eq!(AppointmentStatus::parse(""), None);
    }

    #[test]
    fn cancel_only_from_new_or_pending() {
        for status in ALL {
            assert_eq!(
                status.can_cancel(),
                matches!(status, AppointmentStatus::New | AppointmentStatus::Pending),
            );
        }
    }

    #[test]
    fn reschedule_operations_only_from_rescheduled() {
        for status in ALL {
            assert_eq!(
                status.can_cancel_reschedule(),
                status == AppointmentStatus::Rescheduled
            );
            assert_eq!(
                status.can_accept_reschedule(),
                status == AppointmentStatus::Rescheduled
            );
        }
    }

    #[test]
    fn payment_confirmation_only_from_pending_states() {
        for status in ALL {
            assert_eq!(
                status.can_confirm_payment(),
                matches!(
                    status,
                    AppointmentStatus::Pending | AppointmentStatus::PendingRescheduled
                ),
            );
        }
    }

    #[test]
    fn completed_and_cancelled_are_terminal() {
        for status in ALL {
            assert_eq!(
                status.is_terminal(),
                matches!(
                    status,
                    AppointmentStatus::Completed | AppointmentStatus::Cancelled
                ),
            );
            if status.is_terminal() {
                assert!(!status.can_cancel());
                assert!(!status.can_cancel_reschedule());
                assert!(!status.can_accept_reschedule());
                assert!(!status.can_confirm_payment());
            }
        }
    }

    #[test]
    fn wire_names_match_storage_names() {
        for status in ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
