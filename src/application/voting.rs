use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::domain::{Credits, EventId, ParticipantId, Vote};
use crate::storage::{AuditLogRef, AuditRecord, Ledger};

use super::AppError;

/// Moves voting credits from a participant to an event.
pub struct VotingService {
    ledger: Arc<Ledger>,
    audit: AuditLogRef,
}

impl VotingService {
    pub fn new(ledger: Arc<Ledger>, audit: AuditLogRef) -> Self {
        Self { ledger, audit }
    }

    /// Spend `amount` of the participant's credits on the event.
    ///
    /// The debit and the score credit commit together. The returned vote is
    /// appended to the audit log only after that commit.
    #[instrument(
        skip(self, participant_id, event_id),
        fields(participant = %participant_id, event = %event_id)
    )]
    pub async fn cast_vote(
        &self,
        participant_id: ParticipantId,
        event_id: EventId,
        amount: Credits,
        timestamp: DateTime<Utc>,
    ) -> Result<Vote, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Vote amount must be positive".to_string(),
            ));
        }

        let result = self
            .ledger
            .with_participant_and_event(participant_id, event_id, |participant, event| {
                let participant_id = participant.id;
                participant
                    .debit(amount)
                    .map_err(|short| AppError::InsufficientBalance {
                        participant: participant_id,
                        balance: short.balance,
                        required: short.required,
                    })?;
                event
                    .credit(amount)
                    .map_err(|overflow| AppError::InvalidAmount(overflow.to_string()))?;
                Ok::<_, AppError>(Vote::new(participant_id, event.id, amount, timestamp))
            })
            .await;

        let vote = match result {
            Ok(vote) => vote,
            Err(err) => {
                debug!(error = %err, "vote rejected");
                return Err(err);
            }
        };

        if let Err(err) = self.audit.append(&AuditRecord::Vote(vote.clone())).await {
            warn!(vote = %vote.id, error = %err, "vote committed but audit append failed");
        }

        info!(vote = %vote.id, amount, "vote recorded");
        Ok(vote)
    }
}
