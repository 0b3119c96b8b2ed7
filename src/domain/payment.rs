use crate::domain::status::AppointmentStatus;

/// What a payment confirmation should do, given the appointment's current
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// First confirmation: complete the appointment and mint its coupon.
    Complete,
    /// The payment already settled; return the coupon minted on the first
    /// call and write nothing.
    Replay,
    /// The appointment is not awaiting payment.
    Reject,
}

pub fn classify_confirmation(status: AppointmentStatus, payment_status: bool) -> ConfirmOutcome {
    if status == AppointmentStatus::Completed && payment_status {
        ConfirmOutcome::Replay
    } else if status.can_confirm_payment() {
        ConfirmOutcome::Complete
    } else {
        ConfirmOutcome::Reject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn awaiting_payment_states_complete() {
        assert_eq!(
            classify_confirmation(AppointmentStatus::Pending, false),
            ConfirmOutcome::Complete
        );
        assert_eq!(
            classify_confirmation(AppointmentStatus::PendingRescheduled, false),
            ConfirmOutcome::Complete
        );
    }

    #[test]
    fn repeated_confirmation_replays_instead_of_completing_again() {
        let first = classify_confirmation(AppointmentStatus::Pending, false);
        assert_eq!(first, ConfirmOutcome::Complete);
        // after the first call the appointment is Completed with the payment
        // recorded; the same request must not mint a second coupon
        let second = classify_confirmation(AppointmentStatus::Completed, true);
        assert_eq!(second, ConfirmOutcome::Replay);
    }

    #[test]
    fn non_payable_states_reject() {
        for status in [
            AppointmentStatus::New,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Rescheduled,
        ] {
            assert_eq!(
                classify_confirmation(status, false),
                ConfirmOutcome::Reject,
                "{status:?} should not accept payment"
            );
        }
    }

    #[test]
    fn completed_without_recorded_payment_rejects() {
        assert_eq!(
            classify_confirmation(AppointmentStatus::Completed, false),
            ConfirmOutcome::Reject
        );
    }
}
