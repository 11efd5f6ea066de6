use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Credits, ParticipantId};

pub type EventId = Uuid;

/// A numbered, purchasable position on the board. Slots start at 1.
pub type Slot = u32;

/// An entry on the board. Events collect votes and may occupy a rank slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub category: String,
    /// Accumulated vote credits
    pub score: Credits,
    /// Slot currently held by this event, if any
    pub rank_slot: Option<Slot>,
    /// Amount paid to hold `rank_slot` (0 if never purchased)
    pub purchase_price: Cents,
    /// Participant who bought the slot
    pub owner: Option<ParticipantId>,
    pub created_at: DateTime<Utc>,
}

/// The attributes a buyer wants installed at a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub name: String,
    pub category: String,
    pub initial_score: Credits,
    /// The buyer's existing event to rebind to the slot. When absent the
    /// current occupant is rewritten in place.
    pub source_event_id: Option<EventId>,
}

impl CandidateEvent {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            initial_score: 0,
            source_event_id: None,
        }
    }

    pub fn with_initial_score(mut self, score: Credits) -> Self {
        self.initial_score = score;
        self
    }

    pub fn with_source(mut self, event_id: EventId) -> Self {
        self.source_event_id = Some(event_id);
        self
    }
}

impl Event {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            score: 0,
            rank_slot: None,
            purchase_price: 0,
            owner: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_slotted(&self) -> bool {
        self.rank_slot.is_some()
    }

    /// Add vote credits to the score. The score is unchanged on overflow.
    pub fn credit(&mut self, amount: Credits) -> Result<(), ScoreOverflow> {
        self.score = self.score.checked_add(amount).ok_or(ScoreOverflow {
            score: self.score,
            amount,
        })?;
        Ok(())
    }

    /// Check an offer against the price paid for the slot this event holds.
    /// Matching the current price is enough to take the slot over.
    pub fn accept_offer(&self, offered: Cents) -> Result<(), Outbid> {
        if offered < self.purchase_price {
            return Err(Outbid {
                offered,
                required: self.purchase_price,
            });
        }
        Ok(())
    }

    /// Bind this event to `slot` on behalf of `owner`, taking the candidate's attributes.
    pub fn install(
        &mut self,
        candidate: &CandidateEvent,
        slot: Slot,
        price: Cents,
        owner: ParticipantId,
    ) {
        self.name = candidate.name.clone();
        self.category = candidate.category.clone();
        self.score = candidate.initial_score;
        self.rank_slot = Some(slot);
        self.purchase_price = price;
        self.owner = Some(owner);
    }

    /// Release the slot binding. The event keeps its name and score.
    pub fn vacate(&mut self) {
        self.rank_slot = None;
        self.purchase_price = 0;
        self.owner = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbid {
    pub offered: Cents,
    pub required: Cents,
}

impl std::fmt::Display for Outbid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "offer of {} cents is below the current price of {} cents",
            self.offered, self.required
        )
    }
}

impl std::error::Error for Outbid {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOverflow {
    pub score: Credits,
    pub amount: Credits,
}

impl std::fmt::Display for ScoreOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "score of {} cannot take {} more credits",
            self.score, self.amount
        )
    }
}

impl std::error::Error for ScoreOverflow {}
