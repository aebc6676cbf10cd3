// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!(
            "Validating status transition from {} to {}",
            current_status, new_status
        );

        let valid_transitions = self.get_valid_transitions(current_status);

        if !valid_transitions.contains(new_status) {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                current_status, new_status
            );
            return Err(AppointmentError::InvalidStatusTransition(*current_status));
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Legacy status still present on old rows; behaves like a
            // confirmed booking.
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::Completed => vec![],
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_be_confirmed_or_cancelled() {
        let service = AppointmentLifecycleService::new();

        assert!(service
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Confirmed)
            .is_ok());
        assert!(service
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Cancelled)
            .is_ok());
        assert!(service
            .validate_status_transition(&AppointmentStatus::Pending, &AppointmentStatus::Completed)
            .is_err());
    }

    #[test]
    fn only_confirmed_like_appointments_complete() {
        let service = AppointmentLifecycleService::new();

        assert!(service
            .validate_status_transition(&AppointmentStatus::Confirmed, &AppointmentStatus::Completed)
            .is_ok());
        assert!(service
            .validate_status_transition(&AppointmentStatus::Scheduled, &AppointmentStatus::Completed)
            .is_ok());
    }

    #[test]
    fn terminal_states_reject_all_transitions() {
        let service = AppointmentLifecycleService::new();

        for terminal in [AppointmentStatus::Cancelled, AppointmentStatus::Completed] {
            for next in [
                AppointmentStatus::Pending,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ] {
                assert!(
                    service.validate_status_transition(&terminal, &next).is_err(),
                    "{} -> {} should be rejected",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn cancelled_appointment_cannot_be_confirmed() {
        let service = AppointmentLifecycleService::new();
        let result = service
            .validate_status_transition(&AppointmentStatus::Cancelled, &AppointmentStatus::Confirmed);

        assert!(matches!(
            result,
            Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Cancelled))
        ));
    }
}
