use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Credits;

pub type ParticipantId = Uuid;

/// Someone who can cast votes and buy rank slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Remaining voting credits. Never negative.
    pub balance: Credits,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// # Panics
    ///
    /// Panics if `balance` is negative. Callers validate opening balances first.
    pub fn new(name: impl Into<String>, balance: Credits) -> Self {
        assert!(balance >= 0, "Participant balance must not be negative");
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            balance,
            created_at: Utc::now(),
        }
    }

    /// Take `amount` credits out of the balance.
    /// The balance is left untouched when it cannot cover the amount.
    pub fn debit(&mut self, amount: Credits) -> Result<(), InsufficientBalance> {
        if amount > self.balance {
            return Err(InsufficientBalance {
                balance: self.balance,
                required: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientBalance {
    pub balance: Credits,
    pub required: Credits,
}

impl std::fmt::Display for InsufficientBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "balance of {} credits cannot cover {} credits",
            self.balance, self.required
        )
    }
}

impl std::error::Error for InsufficientBalance {}
