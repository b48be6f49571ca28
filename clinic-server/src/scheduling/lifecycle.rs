//! Appointment lifecycle transitions
//!
//! ```text
//! scheduled ─┬─> confirmed ─┬─> arrived ─┬─> in_queue ─> in_progress ─> completed
//!            └──────────────┴────────────┴──────────────────┘
//! any non-terminal status ─> cancelled
//! ```
//! Steps may be skipped but never reversed; completed and cancelled are final.

use shared::error::{AppError, ErrorCode};
use shared::models::AppointmentStatus;

/// Position along the forward path; cancelled sits outside it.
fn rank(status: AppointmentStatus) -> Option<u8> {
    match status {
        AppointmentStatus::Scheduled => Some(0),
        AppointmentStatus::Confirmed => Some(1),
        AppointmentStatus::Arrived => Some(2),
        AppointmentStatus::InQueue => Some(3),
        AppointmentStatus::InProgress => Some(4),
        AppointmentStatus::Completed => Some(5),
        AppointmentStatus::Cancelled => None,
    }
}

/// Whether `from -> to` is allowed.
///
/// Re-applying a non-terminal status is allowed so repeated requests are
/// idempotent. `completed` is reachable only from `in_progress`.
pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    if from.is_terminal() {
        return false;
    }
    if from == to {
        return true;
    }
    match (to, rank(from), rank(to)) {
        (AppointmentStatus::Cancelled, _, _) => true,
        (AppointmentStatus::Completed, _, _) => from == AppointmentStatus::InProgress,
        (_, Some(a), Some(b)) => b > a,
        _ => false,
    }
}

/// Check a transition, producing the API error for rejected ones.
pub fn ensure_transition(from: AppointmentStatus, to: AppointmentStatus) -> Result<(), AppError> {
    if from.is_terminal() {
        return Err(AppError::new(ErrorCode::AppointmentClosed));
    }
    if !can_transition(from, to) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot change appointment status from {from} to {to}"),
        )
        .with_detail("from", from.as_str())
        .with_detail("to", to.as_str()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn test_forward_transitions() {
        assert!(can_transition(Scheduled, Confirmed));
        assert!(can_transition(Scheduled, InQueue));
        assert!(can_transition(Confirmed, Arrived));
        assert!(can_transition(Arrived, InQueue));
        assert!(can_transition(InQueue, InProgress));
        assert!(can_transition(InProgress, Completed));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!can_transition(Confirmed, Scheduled));
        assert!(!can_transition(InProgress, InQueue));
        assert!(!can_transition(InQueue, Arrived));
    }

    #[test]
    fn test_completed_requires_in_progress() {
        assert!(!can_transition(Scheduled, Completed));
        assert!(!can_transition(InQueue, Completed));
    }

    #[test]
    fn test_cancel_from_any_open_status() {
        for status in AppointmentStatus::ALL {
            assert_eq!(can_transition(status, Cancelled), !status.is_terminal());
        }
    }

    #[test]
    fn test_terminal_accepts_nothing() {
        for target in AppointmentStatus::ALL {
            assert!(!can_transition(Completed, target));
            assert!(!can_transition(Cancelled, target));
        }
    }

    #[test]
    fn test_self_transition_is_idempotent() {
        assert!(can_transition(InQueue, InQueue));
        assert!(!can_transition(Completed, Completed));
    }

    #[test]
    fn test_ensure_transition_errors() {
        assert_eq!(
            ensure_transition(Cancelled, Confirmed).unwrap_err().code,
            ErrorCode::AppointmentClosed
        );
        let err = ensure_transition(InProgress, Scheduled).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
        assert!(err.details.unwrap().contains_key("from"));
    }
}
