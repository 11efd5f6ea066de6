use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::Config;
use crate::domain::{
    CandidateEvent, Cents, Credits, Event, EventId, IntegrityReport, Participant, ParticipantId,
    Slot, Trade, Vote, build_integrity_report,
};
use crate::storage::{AuditLogRef, Ledger, SqliteAuditLog};

use super::{AppError, RankTradingService, Resource, VotingService};

/// Application service for the board.
/// This is the primary interface for any client (CLI, API, etc.).
pub struct BoardService {
    ledger: Arc<Ledger>,
    audit: AuditLogRef,
    voting: VotingService,
    trading: RankTradingService,
}

/// An event together with the votes cast on it.
pub struct EventInfo {
    pub event: Event,
    pub votes: Vec<Vote>,
    pub owner: Option<Participant>,
}

impl BoardService {
    /// Build the service over an existing ledger and audit log.
    pub fn new(ledger: Ledger, audit: AuditLogRef) -> Self {
        let ledger = Arc::new(ledger);
        Self {
            voting: VotingService::new(Arc::clone(&ledger), Arc::clone(&audit)),
            trading: RankTradingService::new(Arc::clone(&ledger), Arc::clone(&audit)),
            ledger,
            audit,
        }
    }

    /// Create (if needed) and migrate the database, auditing into the same file.
    pub async fn init(config: &Config) -> Result<Self, AppError> {
        let ledger = Ledger::init(config).await?;
        let audit = Arc::new(SqliteAuditLog::new(ledger.pool().clone()));
        Ok(Self::new(ledger, audit))
    }

    /// Open an existing database.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let ledger = Ledger::connect(config, false).await?;
        let audit = Arc::new(SqliteAuditLog::new(ledger.pool().clone()));
        Ok(Self::new(ledger, audit))
    }

    pub fn voting(&self) -> &VotingService {
        &self.voting
    }

    pub fn trading(&self) -> &RankTradingService {
        &self.trading
    }

    // ========================
    // Participants
    // ========================

    /// Register a participant with an opening credit balance.
    pub async fn register_participant(
        &self,
        name: String,
        balance: Credits,
    ) -> Result<Participant, AppError> {
        if balance < 0 {
            return Err(AppError::InvalidAmount(
                "Opening balance must not be negative".to_string(),
            ));
        }
        if self.ledger.get_participant_by_name(&name).await?.is_some() {
            return Err(AppError::ParticipantAlreadyExists(name));
        }

        let participant = Participant::new(name, balance);
        self.ledger.save_participant(&participant).await?;
        info!(participant = %participant.id, balance, "participant registered");
        Ok(participant)
    }

    pub async fn participant(&self, id: ParticipantId) -> Result<Participant, AppError> {
        self.ledger
            .get_participant(id)
            .await?
            .ok_or(AppError::NotFound(Resource::Participant(id)))
    }

    /// Look a participant up by name.
    pub async fn participant_by_name(&self, name: &str) -> Result<Participant, AppError> {
        self.ledger
            .get_participant_by_name(name)
            .await?
            .ok_or_else(|| AppError::UnknownParticipant(name.to_string()))
    }

    pub async fn list_participants(&self) -> Result<Vec<Participant>, AppError> {
        Ok(self.ledger.list_participants().await?)
    }

    // ========================
    // Events
    // ========================

    /// Create an unslotted event with no score.
    pub async fn create_event(&self, name: String, category: String) -> Result<Event, AppError> {
        let event = Event::new(name, category);
        self.ledger.save_event(&event).await?;
        info!(event = %event.id, "event created");
        Ok(event)
    }

    pub async fn event(&self, id: EventId) -> Result<Event, AppError> {
        self.ledger
            .get_event(id)
            .await?
            .ok_or(AppError::NotFound(Resource::Event(id)))
    }

    pub async fn event_info(&self, id: EventId) -> Result<EventInfo, AppError> {
        let event = self.event(id).await?;
        let votes = self.votes_for_event(id).await?;
        let owner = match event.owner {
            Some(owner_id) => self.ledger.get_participant(owner_id).await?,
            None => None,
        };
        Ok(EventInfo {
            event,
            votes,
            owner,
        })
    }

    /// The board: slotted events in slot order, then the rest by score.
    pub async fn board(&self) -> Result<Vec<Event>, AppError> {
        Ok(self.ledger.list_events().await?)
    }

    /// The event occupying `slot`.
    pub async fn occupant(&self, slot: Slot) -> Result<Event, AppError> {
        self.ledger
            .with_event_by_slot(slot, |occupant| {
                occupant
                    .cloned()
                    .ok_or(AppError::NotFound(Resource::Slot(slot)))
            })
            .await
    }

    // ========================
    // Core operations
    // ========================

    pub async fn cast_vote(
        &self,
        participant_id: ParticipantId,
        event_id: EventId,
        amount: Credits,
        timestamp: DateTime<Utc>,
    ) -> Result<Vote, AppError> {
        self.voting
            .cast_vote(participant_id, event_id, amount, timestamp)
            .await
    }

    pub async fn purchase_slot(
        &self,
        buyer_id: ParticipantId,
        slot: Slot,
        amount: Cents,
        candidate: CandidateEvent,
    ) -> Result<Trade, AppError> {
        self.trading
            .purchase_slot(buyer_id, slot, amount, candidate)
            .await
    }

    pub async fn seed_slot(
        &self,
        owner_id: ParticipantId,
        event_id: EventId,
        slot: Slot,
    ) -> Result<Trade, AppError> {
        self.trading.seed_slot(owner_id, event_id, slot).await
    }

    // ========================
    // Audit
    // ========================

    pub async fn votes(&self) -> Result<Vec<Vote>, AppError> {
        Ok(self.audit.votes().await?)
    }

    pub async fn trades(&self) -> Result<Vec<Trade>, AppError> {
        Ok(self.audit.trades().await?)
    }

    pub async fn votes_for_event(&self, event_id: EventId) -> Result<Vec<Vote>, AppError> {
        let votes = self.audit.votes().await?;
        Ok(votes.into_iter().filter(|v| v.event == event_id).collect())
    }

    /// Trade history of a slot, oldest first.
    pub async fn trades_for_slot(&self, slot: Slot) -> Result<Vec<Trade>, AppError> {
        let trades = self.audit.trades().await?;
        Ok(trades.into_iter().filter(|t| t.slot == slot).collect())
    }

    // ========================
    // Integrity
    // ========================

    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let participants = self.ledger.list_participants().await?;
        let events = self.ledger.list_events().await?;
        let vote_count = self.audit.votes().await?.len();
        let trades = self.audit.trades().await?;

        Ok(build_integrity_report(
            &participants,
            &events,
            vote_count,
            &trades,
        ))
    }
}
