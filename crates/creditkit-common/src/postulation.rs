//! Postulation (screening) aggregate

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{self, PostulationState};
use crate::util::unix_time;

/// A postulation moving through the screening machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Postulation {
    /// Postulation id
    pub id: Uuid,
    /// Postulant user id
    pub owner_id: Uuid,
    /// Current screening state
    pub state: PostulationState,
    /// Unix time of creation
    pub created_time: u64,
    /// Unix time of last mutation
    pub updated_time: u64,
}

impl Postulation {
    /// Create a new postulation in [`PostulationState::Postulated`]
    pub fn new(owner_id: Uuid) -> Self {
        let now = unix_time();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            state: PostulationState::Postulated,
            created_time: now,
            updated_time: now,
        }
    }

    /// Attempt the transition to `new_state`
    pub fn transition_to(mut self, new_state: PostulationState) -> Result<Self, state::Error> {
        state::check_postulation_transition(self.state, new_state)?;

        self.state = new_state;
        self.updated_time = unix_time();

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screening_flow() {
        let postulation = Postulation::new(Uuid::new_v4());
        assert_eq!(postulation.state, PostulationState::Postulated);

        let reviewed = postulation
            .transition_to(PostulationState::InReview)
            .expect("POSTULATED -> IN_REVIEW");
        let approved = reviewed
            .transition_to(PostulationState::Approved)
            .expect("IN_REVIEW -> APPROVED");

        assert!(approved
            .transition_to(PostulationState::Cancelled)
            .is_err());
    }
}
