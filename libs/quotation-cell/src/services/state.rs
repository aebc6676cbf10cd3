// libs/quotation-cell/src/services/state.rs
use tracing::{debug, warn};

use crate::models::{QuotationError, QuotationStatus};

/// Transition table for the quotation lifecycle:
/// pending -> {quoted, rejected}; quoted -> {accepted, rejected};
/// accepted, rejected and expired absorb. `expired` has no inbound edge —
/// it is reserved for a future validity sweep.
pub fn valid_transitions(current: QuotationStatus) -> &'static [QuotationStatus] {
    match current {
        QuotationStatus::Pending => &[QuotationStatus::Quoted, QuotationStatus::Rejected],
        QuotationStatus::Quoted => &[QuotationStatus::Accepted, QuotationStatus::Rejected],
        QuotationStatus::Accepted | QuotationStatus::Rejected | QuotationStatus::Expired => &[],
    }
}

pub fn validate_transition(
    current: QuotationStatus,
    next: QuotationStatus,
) -> Result<(), QuotationError> {
    debug!("Validating quotation transition {} -> {}", current, next);

    if !valid_transitions(current).contains(&next) {
        warn!("Invalid quotation transition attempted: {} -> {}", current, next);
        return Err(QuotationError::InvalidState(current));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use QuotationStatus::*;

    #[test]
    fn accept_requires_quoted() {
        assert!(validate_transition(Quoted, Accepted).is_ok());

        for current in [Pending, Accepted, Rejected, Expired] {
            assert!(
                matches!(
                    validate_transition(current, Accepted),
                    Err(QuotationError::InvalidState(s)) if s == current
                ),
                "{} -> accepted should be rejected",
                current
            );
        }
    }

    #[test]
    fn reject_allowed_from_pending_and_quoted_only() {
        assert!(validate_transition(Pending, Rejected).is_ok());
        assert!(validate_transition(Quoted, Rejected).is_ok());

        for current in [Accepted, Rejected, Expired] {
            assert!(validate_transition(current, Rejected).is_err());
        }
    }

    #[test]
    fn quote_only_from_pending() {
        assert!(validate_transition(Pending, Quoted).is_ok());
        assert!(validate_transition(Quoted, Quoted).is_err());
        assert!(validate_transition(Rejected, Quoted).is_err());
    }

    #[test]
    fn expired_is_unreachable() {
        for current in [Pending, Quoted, Accepted, Rejected, Expired] {
            assert!(
                validate_transition(current, Expired).is_err(),
                "{} -> expired should have no edge",
                current
            );
        }
    }

    #[test]
    fn terminal_states_absorb() {
        for terminal in [Accepted, Rejected, Expired] {
            assert!(valid_transitions(terminal).is_empty());
        }
    }
}
