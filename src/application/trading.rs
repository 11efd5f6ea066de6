use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::{CandidateEvent, Cents, EventId, ParticipantId, Slot, Trade};
use crate::storage::{AuditLogRef, AuditRecord, Ledger};

use super::{AppError, Resource};

/// Sells rank slots to the highest (or equal) bidder.
pub struct RankTradingService {
    ledger: Arc<Ledger>,
    audit: AuditLogRef,
}

impl RankTradingService {
    pub fn new(ledger: Arc<Ledger>, audit: AuditLogRef) -> Self {
        Self { ledger, audit }
    }

    /// Buy `slot` for `amount` and install `candidate` there.
    ///
    /// The slot must already have an occupant and `amount` must be at least the
    /// price the occupant paid. Without a source event the occupant row is
    /// rewritten in place; with one, the occupant is released and the source
    /// event is bound to the slot instead. The source must be unowned or
    /// already owned by the buyer. Either way exactly one event holds the slot
    /// afterwards.
    #[instrument(skip(self, buyer_id, candidate), fields(buyer = %buyer_id))]
    pub async fn purchase_slot(
        &self,
        buyer_id: ParticipantId,
        slot: Slot,
        amount: Cents,
        candidate: CandidateEvent,
    ) -> Result<Trade, AppError> {
        validate_slot(slot)?;
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Purchase amount must be positive".to_string(),
            ));
        }
        if candidate.initial_score < 0 {
            return Err(AppError::InvalidAmount(
                "Initial score must not be negative".to_string(),
            ));
        }

        let trade = match self.transfer_slot(buyer_id, slot, amount, &candidate).await {
            Ok(trade) => trade,
            Err(err) => {
                debug!(error = %err, "purchase rejected");
                return Err(err);
            }
        };

        self.record(&trade).await;
        info!(trade = %trade.id, event = %trade.event, "slot purchased");
        Ok(trade)
    }

    async fn transfer_slot(
        &self,
        buyer_id: ParticipantId,
        slot: Slot,
        amount: Cents,
        candidate: &CandidateEvent,
    ) -> Result<Trade, AppError> {
        self.ledger
            .with_participant_and_slot(
                buyer_id,
                slot,
                candidate.source_event_id,
                |buyer, occupant, source| {
                    occupant
                        .accept_offer(amount)
                        .map_err(|outbid| AppError::Outbid {
                            slot,
                            offered: outbid.offered,
                            required: outbid.required,
                        })?;

                    let winner = match source {
                        Some(source) => {
                            // Only an unowned event or one of the buyer's own can be cashed in.
                            match source.owner {
                                Some(owner) if owner != buyer.id => {
                                    return Err(AppError::NotEventOwner {
                                        event: source.id,
                                        participant: buyer.id,
                                    });
                                }
                                _ => {}
                            }
                            occupant.vacate();
                            source.install(candidate, slot, amount, buyer.id);
                            source.id
                        }
                        None => {
                            occupant.install(candidate, slot, amount, buyer.id);
                            occupant.id
                        }
                    };

                    Ok(Trade::new(buyer.id, winner, amount, slot))
                },
            )
            .await
    }

    /// Put an unslotted event on a vacant slot at price zero.
    ///
    /// This is how slots come into existence; afterwards they can only change
    /// hands through `purchase_slot`. A zero-amount trade is recorded so the
    /// binding is backed like any purchased one.
    #[instrument(skip(self, owner_id, event_id), fields(owner = %owner_id, event = %event_id))]
    pub async fn seed_slot(
        &self,
        owner_id: ParticipantId,
        event_id: EventId,
        slot: Slot,
    ) -> Result<Trade, AppError> {
        validate_slot(slot)?;

        let mut tx = self.ledger.begin().await?;

        let owner = tx
            .participant(owner_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Participant(owner_id)))?;
        let mut event = tx
            .event(event_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Event(event_id)))?;

        if let Some(held) = event.rank_slot {
            return Err(AppError::InvalidSlot(format!(
                "event {} already holds slot {}",
                event.id, held
            )));
        }
        if tx.event_by_slot(slot).await?.is_some() {
            return Err(AppError::InvalidSlot(format!("slot {} is occupied", slot)));
        }

        event.rank_slot = Some(slot);
        event.purchase_price = 0;
        event.owner = Some(owner.id);
        tx.put_event(&event).await?;

        let trade = Trade::new(owner.id, event.id, 0, slot);
        tx.commit().await?;

        self.record(&trade).await;
        info!(trade = %trade.id, "slot seeded");
        Ok(trade)
    }

    async fn record(&self, trade: &Trade) {
        if let Err(err) = self.audit.append(&AuditRecord::Trade(trade.clone())).await {
            warn!(trade = %trade.id, error = %err, "trade committed but audit append failed");
        }
    }
}

fn validate_slot(slot: Slot) -> Result<(), AppError> {
    if slot == 0 {
        return Err(AppError::InvalidSlot("slots are numbered from 1".to_string()));
    }
    Ok(())
}
