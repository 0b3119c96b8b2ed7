use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::status::AppointmentStatus;
use crate::models::AppointmentEntity;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One appointment as it appears in the user's grouped listing. The review
/// and payment flags are only populated for Completed items.
#[derive(Serialize, Debug, ToSchema)]
pub struct AppointmentItem {
    pub id: i32,
    pub model: Option<String>,
    pub preferred_time: String,
    pub status: AppointmentStatus,
    pub description: Option<String>,
    pub cancel_reason: Option<String>,
    pub reschedule_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_reviewed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<bool>,
}

/// The four user-facing buckets plus Rescheduled. `Pending` and
/// `Pending_Rescheduled` collapse into one "Pending" label here; the
/// distinction only matters for transition guards.
#[derive(Serialize, Debug, Default, ToSchema)]
pub struct GroupedAppointments {
    #[serde(rename = "New")]
    pub new: Vec<AppointmentItem>,
    #[serde(rename = "Pending")]
    pub pending: Vec<AppointmentItem>,
    #[serde(rename = "Completed")]
    pub completed: Vec<AppointmentItem>,
    #[serde(rename = "Cancelled")]
    pub cancelled: Vec<AppointmentItem>,
    #[serde(rename = "Rescheduled")]
    pub rescheduled: Vec<AppointmentItem>,
}

pub fn group_appointments(appointments: Vec<AppointmentEntity>) -> GroupedAppointments {
    let mut grouped = GroupedAppointments::default();
    for appointment in appointments {
        let completed = appointment.status == AppointmentStatus::Completed;
        let item = AppointmentItem {
            id: appointment.id,
            model: appointment.model.clone(),
            preferred_time: appointment.preferred_time.format(TIME_FORMAT).to_string(),
            status: appointment.status,
            description: appointment.problem_description.clone(),
            cancel_reason: appointment.cancel_reason.clone(),
            reschedule_time: appointment
                .reschedule_time
                .map(|t| t.format(TIME_FORMAT).to_string()),
            has_reviewed: completed.then(|| appointment.has_reviewed()),
            payment_status: completed.then_some(appointment.payment_status),
        };
        match appointment.status {
            AppointmentStatus::New => grouped.new.push(item),
            AppointmentStatus::Pending | AppointmentStatus::PendingRescheduled => {
                grouped.pending.push(item)
            }
            AppointmentStatus::Completed => grouped.completed.push(item),
            AppointmentStatus::Cancelled => grouped.cancelled.push(item),
            AppointmentStatus::Rescheduled => grouped.rescheduled.push(item),
        }
    }
    grouped
}

/// Arithmetic mean of the given ratings; 0.0 for an empty slice rather than
/// an error or null.
pub fn mean_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn appointment(id: i32, status: AppointmentStatus) -> AppointmentEntity {
        AppointmentEntity {
            id,
            user_id: 7,
            provider_id: 3,
            gadget_type_id: 1,
            model: Some("Pixel 8".into()),
            purchase_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            problem_description: Some("cracked screen".into()),
            preferred_time: Utc.with_ymd_and_hms(2026, 9, 1, 10, 30, 0).unwrap(),
            status,
            cancel_reason: None,
            reschedule_time: None,
            rating: None,
            comment: None,
            amount: None,
            order_id: None,
            payment_id: None,
            payment_status: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn both_pending_states_land_in_the_pending_bucket() {
        let grouped = group_appointments(vec![
            appointment(1, AppointmentStatus::Pending),
            appointment(2, AppointmentStatus::PendingRescheduled),
        ]);
        assert_eq!(grouped.pending.len(), 2);
        assert!(grouped.new.is_empty());
        // the internal status labels survive the merge
        assert_eq!(grouped.pending[0].status, AppointmentStatus::Pending);
        assert_eq!(
            grouped.pending[1].status,
            AppointmentStatus::PendingRescheduled
        );
    }

    #[test]
    fn each_remaining_status_lands_in_its_own_bucket() {
        let grouped = group_appointments(vec![
            appointment(1, AppointmentStatus::New),
            appointment(2, AppointmentStatus::Completed),
            appointment(3, AppointmentStatus::Cancelled),
            appointment(4, AppointmentStatus::Rescheduled),
        ]);
        assert_eq!(grouped.new.len(), 1);
        assert_eq!(grouped.completed.len(), 1);
        assert_eq!(grouped.cancelled.len(), 1);
        assert_eq!(grouped.rescheduled.len(), 1);
        assert!(grouped.pending.is_empty());
    }

    #[test]
    fn review_and_payment_flags_only_present_when_completed() {
        let mut done = appointment(1, AppointmentStatus::Completed);
        done.rating = Some(4);
        done.payment_status = true;
        let pending = appointment(2, AppointmentStatus::Pending);

        let grouped = group_appointments(vec![done, pending]);
        assert_eq!(grouped.completed[0].has_reviewed, Some(true));
        assert_eq!(grouped.completed[0].payment_status, Some(true));
        assert_eq!(grouped.pending[0].has_reviewed, None);
        assert_eq!(grouped.pending[0].payment_status, None);
    }

    #[test]
    fn comment_alone_counts_as_reviewed() {
        let mut done = appointment(1, AppointmentStatus::Completed);
        done.comment = Some("quick fix".into());
        let grouped = group_appointments(vec![done]);
        assert_eq!(grouped.completed[0].has_reviewed, Some(true));
    }

    #[test]
    fn timestamps_are_rendered_in_minutes_precision() {
        let mut a = appointment(1, AppointmentStatus::Rescheduled);
        a.reschedule_time = Some(Utc.with_ymd_and_hms(2026, 9, 3, 14, 0, 0).unwrap());
        let grouped = group_appointments(vec![a]);
        assert_eq!(grouped.rescheduled[0].preferred_time, "2026-09-01 10:30");
        assert_eq!(
            grouped.rescheduled[0].reschedule_time.as_deref(),
            Some("2026-09-03 14:00")
        );
    }

    #[test]
    fn mean_rating_of_nothing_is_zero() {
        assert_eq!(mean_rating(&[]), 0.0);
    }

    #[test]
    fn mean_rating_averages_plainly() {
        assert_eq!(mean_rating(&[5]), 5.0);
        assert_eq!(mean_rating(&[1, 2, 3, 4, 5]), 3.0);
        assert_eq!(mean_rating(&[4, 5]), 4.5);
    }
}
