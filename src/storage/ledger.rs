use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{Event, EventId, Participant, ParticipantId, Slot};

use super::MIGRATION_001_INITIAL;

const PARTICIPANT_COLUMNS: &str = "id, name, balance, created_at";
const EVENT_COLUMNS: &str =
    "id, name, category, score, rank_slot, purchase_price, owner_id, created_at";

/// Failures raised while resolving records inside a ledger transaction.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    #[error("No event occupies slot {0}")]
    SlotVacant(Slot),

    #[error("Participant name already taken: {0}")]
    DuplicateName(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Transactional store for participants and events.
///
/// Every read-modify-write runs inside a `BEGIN IMMEDIATE` transaction, so the
/// write lock is held from the first read until commit. Two transactions that
/// touch the same participant, event or slot therefore never interleave, and a
/// failed transaction is rolled back when its `LedgerTx` is dropped.
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database described by `config`.
    /// With `create` set, a missing database file is created.
    pub async fn connect(config: &Config, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.database)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout())
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", config.database.display()))?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Connect, creating the database if needed, and apply migrations.
    pub async fn init(config: &Config) -> Result<Self> {
        let ledger = Self::connect(config, true).await?;
        ledger.migrate().await?;
        Ok(ledger)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a write transaction.
    pub async fn begin(&self) -> LedgerResult<LedgerTx> {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin ledger transaction")?;
        Ok(LedgerTx { tx })
    }

    // ========================
    // Transactional access
    // ========================

    /// Load a participant and an event, hand both to `f`, and persist them if `f` succeeds.
    /// Nothing is written when either id is unknown or `f` returns an error.
    pub async fn with_participant_and_event<T, E, F>(
        &self,
        participant_id: ParticipantId,
        event_id: EventId,
        f: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Participant, &mut Event) -> std::result::Result<T, E>,
        E: From<LedgerError>,
    {
        let mut tx = self.begin().await?;

        let mut participant = tx
            .participant(participant_id)
            .await?
            .ok_or(LedgerError::ParticipantNotFound(participant_id))?;
        let mut event = tx
            .event(event_id)
            .await?
            .ok_or(LedgerError::EventNotFound(event_id))?;

        let output = f(&mut participant, &mut event)?;

        tx.put_participant(&participant).await?;
        tx.put_event(&event).await?;
        tx.commit().await?;
        Ok(output)
    }

    /// Load the event bound to `slot` (if any), hand it to `f`, and persist it if `f` succeeds.
    pub async fn with_event_by_slot<T, E, F>(&self, slot: Slot, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(Option<&mut Event>) -> std::result::Result<T, E>,
        E: From<LedgerError>,
    {
        let mut tx = self.begin().await?;
        let mut occupant = tx.event_by_slot(slot).await?;

        let output = f(occupant.as_mut())?;

        if let Some(event) = &occupant {
            tx.put_event(event).await?;
        }
        tx.commit().await?;
        Ok(output)
    }

    /// Load a participant and the occupant of `slot`, plus `source_id` when it names
    /// another event, hand them to `f`, and persist both events if `f` succeeds.
    ///
    /// The occupant is written before the source so the slot never has two
    /// holders, even mid-transaction.
    pub async fn with_participant_and_slot<T, E, F>(
        &self,
        participant_id: ParticipantId,
        slot: Slot,
        source_id: Option<EventId>,
        f: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(&Participant, &mut Event, Option<&mut Event>) -> std::result::Result<T, E>,
        E: From<LedgerError>,
    {
        let mut tx = self.begin().await?;

        let participant = tx
            .participant(participant_id)
            .await?
            .ok_or(LedgerError::ParticipantNotFound(participant_id))?;
        let mut occupant = tx
            .event_by_slot(slot)
            .await?
            .ok_or(LedgerError::SlotVacant(slot))?;
        let mut source = match source_id {
            Some(id) if id != occupant.id => Some(
                tx.event(id)
                    .await?
                    .ok_or(LedgerError::EventNotFound(id))?,
            ),
            _ => None,
        };

        let output = f(&participant, &mut occupant, source.as_mut())?;

        tx.put_event(&occupant).await?;
        if let Some(source) = &source {
            tx.put_event(source).await?;
        }
        tx.commit().await?;
        Ok(output)
    }

    // ========================
    // Registration and reads
    // ========================

    /// Insert a new participant. Names are unique.
    pub async fn save_participant(&self, participant: &Participant) -> LedgerResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO participants (id, name, balance, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(participant.id.to_string())
        .bind(&participant.name)
        .bind(participant.balance)
        .bind(participant.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(LedgerError::DuplicateName(participant.name.clone()))
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context("Failed to save participant")
                .into()),
        }
    }

    /// Insert a new event.
    pub async fn save_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, name, category, score, rank_slot, purchase_price, owner_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(&event.name)
        .bind(&event.category)
        .bind(event.score)
        .bind(event.rank_slot.map(i64::from))
        .bind(event.purchase_price)
        .bind(event.owner.map(|id| id.to_string()))
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save event")?;
        Ok(())
    }

    pub async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        let row = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch participant")?;

        row.as_ref().map(row_to_participant).transpose()
    }

    pub async fn get_participant_by_name(&self, name: &str) -> Result<Option<Participant>> {
        let row = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch participant by name")?;

        row.as_ref().map(row_to_participant).transpose()
    }

    pub async fn list_participants(&self) -> Result<Vec<Participant>> {
        let rows = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list participants")?;

        rows.iter().map(row_to_participant).collect()
    }

    pub async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch event")?;

        row.as_ref().map(row_to_event).transpose()
    }

    /// All events: slotted ones by slot, then the rest by score (highest first).
    pub async fn list_events(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            ORDER BY rank_slot IS NULL, rank_slot, score DESC, created_at
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list events")?;

        rows.iter().map(row_to_event).collect()
    }
}

/// An open ledger transaction. Dropping it without `commit` rolls back.
pub struct LedgerTx {
    tx: Transaction<'static, Sqlite>,
}

impl LedgerTx {
    pub async fn participant(&mut self, id: ParticipantId) -> LedgerResult<Option<Participant>> {
        let row = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch participant")?;

        Ok(row.as_ref().map(row_to_participant).transpose()?)
    }

    pub async fn event(&mut self, id: EventId) -> LedgerResult<Option<Event>> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch event")?;

        Ok(row.as_ref().map(row_to_event).transpose()?)
    }

    /// The event currently bound to `slot`, if any.
    pub async fn event_by_slot(&mut self, slot: Slot) -> LedgerResult<Option<Event>> {
        let row = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE rank_slot = ?"
        ))
        .bind(i64::from(slot))
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch event by slot")?;

        Ok(row.as_ref().map(row_to_event).transpose()?)
    }

    pub async fn put_participant(&mut self, participant: &Participant) -> LedgerResult<()> {
        sqlx::query("UPDATE participants SET name = ?, balance = ? WHERE id = ?")
            .bind(&participant.name)
            .bind(participant.balance)
            .bind(participant.id.to_string())
            .execute(&mut *self.tx)
            .await
            .context("Failed to update participant")?;
        Ok(())
    }

    /// Write back an event. When moving a slot between events, write the
    /// event giving the slot up first: the slot column is unique.
    pub async fn put_event(&mut self, event: &Event) -> LedgerResult<()> {
        sqlx::query(
            r#"
            UPDATE events
            SET name = ?, category = ?, score = ?, rank_slot = ?, purchase_price = ?, owner_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&event.name)
        .bind(&event.category)
        .bind(event.score)
        .bind(event.rank_slot.map(i64::from))
        .bind(event.purchase_price)
        .bind(event.owner.map(|id| id.to_string()))
        .bind(event.id.to_string())
        .execute(&mut *self.tx)
        .await
        .context("Failed to update event")?;
        Ok(())
    }

    pub async fn commit(self) -> LedgerResult<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit ledger transaction")?;
        debug!("ledger transaction committed");
        Ok(())
    }
}

fn parse_timestamp(value: &str, field: &'static str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid {field} timestamp"))?
        .with_timezone(&Utc))
}

fn row_to_participant(row: &SqliteRow) -> Result<Participant> {
    let id_str: String = row.get("id");
    let created_at_str: String = row.get("created_at");

    Ok(Participant {
        id: Uuid::parse_str(&id_str).context("Invalid participant ID")?,
        name: row.get("name"),
        balance: row.get("balance"),
        created_at: parse_timestamp(&created_at_str, "created_at")?,
    })
}

fn row_to_event(row: &SqliteRow) -> Result<Event> {
    let id_str: String = row.get("id");
    let rank_slot: Option<i64> = row.get("rank_slot");
    let owner_str: Option<String> = row.get("owner_id");
    let created_at_str: String = row.get("created_at");

    Ok(Event {
        id: Uuid::parse_str(&id_str).context("Invalid event ID")?,
        name: row.get("name"),
        category: row.get("category"),
        score: row.get("score"),
        rank_slot: rank_slot
            .map(Slot::try_from)
            .transpose()
            .context("Invalid rank slot")?,
        purchase_price: row.get("purchase_price"),
        owner: owner_str
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .context("Invalid owner ID")?,
        created_at: parse_timestamp(&created_at_str, "created_at")?,
    })
}
