use crate::error::{Error, Result};
use crate::models::enums::CandidateStatus;

impl CandidateStatus {
    /// Outgoing edges of the status graph. `Rejected` has none.
    pub fn allowed_transitions(&self) -> &'static [CandidateStatus] {
        use CandidateStatus::*;
        match self {
            Applied => &[Shortlisted, Rejected],
            Shortlisted => &[Interviewed, Rejected],
            Interviewed => &[Offered, Rejected],
            Offered => &[Rejected],
            Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, to: CandidateStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

pub fn can_transition(from: CandidateStatus, to: CandidateStatus) -> bool {
    from.can_transition_to(to)
}

pub fn check_transition(from: CandidateStatus, to: CandidateStatus) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CandidateStatus::*;

    const EDGES: &[(CandidateStatus, CandidateStatus)] = &[
        (Applied, Shortlisted),
        (Applied, Rejected),
        (Shortlisted, Interviewed),
        (Shortlisted, Rejected),
        (Interviewed, Offered),
        (Interviewed, Rejected),
        (Offered, Rejected),
    ];

    #[test]
    fn only_listed_edges_are_allowed() {
        for from in CandidateStatus::ALL {
            for to in CandidateStatus::ALL {
                let expected = EDGES.contains(&(*from, *to));
                assert_eq!(
                    can_transition(*from, *to),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
                assert_eq!(check_transition(*from, *to).is_ok(), expected);
            }
        }
    }

    #[test]
    fn self_loops_are_rejected() {
        for status in CandidateStatus::ALL {
            assert!(!can_transition(*status, *status));
        }
    }

    #[test]
    fn rejected_is_the_only_terminal_state() {
        for status in CandidateStatus::ALL {
            assert_eq!(status.is_terminal(), *status == Rejected);
        }
    }

    #[test]
    fn skipping_ahead_reports_both_states() {
        let err = check_transition(Shortlisted, Offered).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid status transition from shortlisted to offered"
        );
    }

    #[test]
    fn happy_path_walk() {
        let path = [Applied, Shortlisted, Interviewed, Offered, Rejected];
        for pair in path.windows(2) {
            assert!(check_transition(pair[0], pair[1]).is_ok());
        }
    }
}
