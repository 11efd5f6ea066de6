use std::fmt;

use thiserror::Error;

use crate::domain::{Cents, Credits, EventId, ParticipantId, Slot};
use crate::storage::LedgerError;

/// The record a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Participant(ParticipantId),
    Event(EventId),
    /// No event currently occupies the slot
    Slot(Slot),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Participant(id) => write!(f, "Participant {}", id),
            Resource::Event(id) => write!(f, "Event {}", id),
            Resource::Slot(slot) => write!(f, "Occupant of slot {}", slot),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(Resource),

    #[error(
        "Insufficient balance for participant {participant}: balance {balance}, required {required}"
    )]
    InsufficientBalance {
        participant: ParticipantId,
        balance: Credits,
        required: Credits,
    },

    #[error("Outbid on slot {slot}: offered {offered}, current price {required}")]
    Outbid {
        slot: Slot,
        offered: Cents,
        required: Cents,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("No participant named '{0}'")]
    UnknownParticipant(String),

    #[error("Participant already exists: {0}")]
    ParticipantAlreadyExists(String),

    #[error("Event {event} is held by another participant")]
    NotEventOwner {
        event: EventId,
        participant: ParticipantId,
    },

    /// Transaction-layer failure (lock timeout, I/O). Nothing was committed.
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// True when the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_) | AppError::UnknownParticipant(_)
        )
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ParticipantNotFound(id) => AppError::NotFound(Resource::Participant(id)),
            LedgerError::EventNotFound(id) => AppError::NotFound(Resource::Event(id)),
            LedgerError::SlotVacant(slot) => AppError::NotFound(Resource::Slot(slot)),
            LedgerError::DuplicateName(name) => AppError::ParticipantAlreadyExists(name),
            LedgerError::Storage(err) => AppError::Storage(err),
        }
    }
}
