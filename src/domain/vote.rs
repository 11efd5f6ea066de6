use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Credits, EventId, ParticipantId};

pub type VoteId = Uuid;

/// Proof that a participant spent credits on an event. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub participant: ParticipantId,
    pub event: EventId,
    /// Credits spent (always positive)
    pub amount: Credits,
    /// When the vote was cast, as reported by the caller
    pub timestamp: DateTime<Utc>,
    /// When the ledger committed it
    pub recorded_at: DateTime<Utc>,
}

impl Vote {
    /// # Panics
    ///
    /// Panics if `amount` is not positive. `VotingService` rejects such amounts
    /// before any vote is built.
    pub fn new(
        participant: ParticipantId,
        event: EventId,
        amount: Credits,
        timestamp: DateTime<Utc>,
    ) -> Self {
        assert!(amount > 0, "Vote amount must be positive");
        Self {
            id: Uuid::new_v4(),
            participant,
            event,
            amount,
            timestamp,
            recorded_at: Utc::now(),
        }
    }
}
