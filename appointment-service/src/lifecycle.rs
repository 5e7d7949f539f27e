// Appointment status state machine
use crate::models::AppointmentStatus;
use error_common::{ClinicError, Result};

/// Valid next statuses for a given current status.
///
/// Completion must pass through confirmation: a pending appointment cannot
/// jump straight to completed, even though the system this replaces accepted
/// that through its generic status endpoint.
pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
    match current {
        AppointmentStatus::Pending => {
            &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
        }
        AppointmentStatus::Confirmed => {
            &[AppointmentStatus::Completed, AppointmentStatus::Cancelled]
        }
        // Terminal states
        AppointmentStatus::Completed | AppointmentStatus::Cancelled => &[],
    }
}

pub fn is_terminal(status: AppointmentStatus) -> bool {
    valid_transitions(status).is_empty()
}

pub fn validate_transition(from: AppointmentStatus, to: AppointmentStatus) -> Result<()> {
    if valid_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ClinicError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    const ALL: [AppointmentStatus; 4] = [Pending, Confirmed, Completed, Cancelled];

    #[test]
    fn pending_confirms_or_cancels() {
        assert!(validate_transition(Pending, Confirmed).is_ok());
        assert!(validate_transition(Pending, Cancelled).is_ok());
    }

    #[test]
    fn completion_requires_confirmation_first() {
        assert!(matches!(
            validate_transition(Pending, Completed),
            Err(ClinicError::InvalidTransition { .. })
        ));
        assert!(validate_transition(Confirmed, Completed).is_ok());
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for terminal in [Completed, Cancelled] {
            assert!(is_terminal(terminal));
            for target in ALL {
                assert!(validate_transition(terminal, target).is_err());
            }
        }
    }

    #[test]
    fn every_transition_stays_inside_the_status_set() {
        for from in ALL {
            for to in valid_transitions(from) {
                assert!(ALL.contains(to));
            }
        }
    }

    #[test]
    fn self_transitions_are_rejected() {
        for status in ALL {
            assert!(validate_transition(status, status).is_err());
        }
    }
}
