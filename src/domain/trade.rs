use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, EventId, ParticipantId, Slot};

pub type TradeId = Uuid;

/// Proof that a participant bought a rank slot. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub buyer: ParticipantId,
    /// Event occupying the slot after the purchase
    pub event: EventId,
    pub amount: Cents,
    pub slot: Slot,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn new(buyer: ParticipantId, event: EventId, amount: Cents, slot: Slot) -> Self {
        Self {
            id: Uuid::new_v4(),
            buyer,
            event,
            amount,
            slot,
            timestamp: Utc::now(),
        }
    }
}
