use thiserror::Error;

use crate::models::text_enum;

text_enum! {
    /// Where an application sits in the hiring pipeline.
    pub enum ApplicationStatus {
        Applied => "applied",
        Screening => "screening",
        Interview => "interview",
        Offer => "offer",
        Hired => "hired",
        Rejected => "rejected",
        Withdrawn => "withdrawn",
    }
}

/// The forward pipeline, in order. Rejected and withdrawn leave it from any open stage.
pub const PIPELINE_STAGES: [ApplicationStatus; 5] = [
    ApplicationStatus::Applied,
    ApplicationStatus::Screening,
    ApplicationStatus::Interview,
    ApplicationStatus::Offer,
    ApplicationStatus::Hired,
];

impl ApplicationStatus {
    pub fn is_terminal(&self) -> bool {
        allowed_transitions(*self).is_empty()
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Application is already in status '{0}'")]
    AlreadyInStatus(ApplicationStatus),

    #[error("Application is in terminal status '{0}' and cannot change")]
    Terminal(ApplicationStatus),

    #[error("Invalid status transition from '{from}' to '{to}'")]
    NotAllowed {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

/// Statuses reachable in one step from `from`. Empty for terminal statuses.
pub fn allowed_transitions(from: ApplicationStatus) -> &'static [ApplicationStatus] {
    use ApplicationStatus::*;

    match from {
        Applied => &[Screening, Rejected, Withdrawn],
        Screening => &[Interview, Rejected, Withdrawn],
        Interview => &[Offer, Rejected, Withdrawn],
        Offer => &[Hired, Rejected, Withdrawn],
        Hired | Rejected | Withdrawn => &[],
    }
}

pub fn validate_transition(
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> Result<(), TransitionError> {
    if from == to {
        return Err(TransitionError::AlreadyInStatus(from));
    }
    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }
    if !allowed_transitions(from).contains(&to) {
        return Err(TransitionError::NotAllowed { from, to });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn test_happy_path_walks_the_pipeline() {
        for pair in PIPELINE_STAGES.windows(2) {
            assert_eq!(validate_transition(pair[0], pair[1]), Ok(()));
        }
    }

    #[test]
    fn test_same_status_is_rejected() {
        assert_eq!(
            validate_transition(Screening, Screening),
            Err(TransitionError::AlreadyInStatus(Screening))
        );
    }

    #[test]
    fn test_stage_skipping_is_not_allowed() {
        assert_eq!(
            validate_transition(Applied, Offer),
            Err(TransitionError::NotAllowed {
                from: Applied,
                to: Offer
            })
        );
        assert!(validate_transition(Screening, Hired).is_err());
    }

    #[test]
    fn test_backwards_moves_are_not_allowed() {
        assert!(validate_transition(Interview, Screening).is_err());
        assert!(validate_transition(Offer, Applied).is_err());
    }

    #[test]
    fn test_reject_and_withdraw_from_any_open_stage() {
        for from in [Applied, Screening, Interview, Offer] {
            assert_eq!(validate_transition(from, Rejected), Ok(()));
            assert_eq!(validate_transition(from, Withdrawn), Ok(()));
        }
    }

    #[test]
    fn test_terminal_statuses_are_frozen() {
        for terminal in [Hired, Rejected, Withdrawn] {
            assert!(terminal.is_terminal());
            assert_eq!(
                validate_transition(terminal, Screening),
                Err(TransitionError::Terminal(terminal))
            );
        }
        // withdrawing a hired application is still a transition out of a terminal state
        assert_eq!(
            validate_transition(Hired, Withdrawn),
            Err(TransitionError::Terminal(Hired))
        );
    }

    #[test]
    fn test_every_status_is_covered_by_the_table() {
        let reachable: Vec<_> = ApplicationStatus::ALL
            .iter()
            .flat_map(|s| allowed_transitions(*s).iter().copied())
            .collect();
        for status in ApplicationStatus::ALL {
            if *status != Applied {
                assert!(reachable.contains(status), "{status} is unreachable");
            }
        }
        assert!(!reachable.contains(&Applied));
    }

    #[test]
    fn test_error_messages_name_both_statuses() {
        let err = validate_transition(Applied, Hired).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid status transition from 'applied' to 'hired'"
        );
    }
}
