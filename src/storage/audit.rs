use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Slot, Trade, Vote};

/// An immutable entry in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AuditRecord {
    Vote(Vote),
    Trade(Trade),
}

/// Append-only sink for votes and trades.
///
/// Appends happen after the ledger commit they describe, so a failed append
/// never undoes a committed vote or trade.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<()>;

    /// All votes in append order.
    async fn votes(&self) -> Result<Vec<Vote>>;

    /// All trades in append order.
    async fn trades(&self) -> Result<Vec<Trade>>;
}

pub type AuditLogRef = Arc<dyn AuditLog>;

/// Audit log stored in the `votes` and `trades` tables next to the ledger.
#[derive(Clone)]
pub struct SqliteAuditLog {
    pool: SqlitePool,
}

impl SqliteAuditLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_vote(row: &SqliteRow) -> Result<Vote> {
        let id_str: String = row.get("id");
        let participant_str: String = row.get("participant_id");
        let event_str: String = row.get("event_id");
        let timestamp_str: String = row.get("timestamp");
        let recorded_at_str: String = row.get("recorded_at");

        Ok(Vote {
            id: Uuid::parse_str(&id_str).context("Invalid vote ID")?,
            participant: Uuid::parse_str(&participant_str).context("Invalid participant ID")?,
            event: Uuid::parse_str(&event_str).context("Invalid event ID")?,
            amount: row.get("amount"),
            timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                .context("Invalid timestamp")?
                .with_timezone(&Utc),
            recorded_at: DateTime::parse_from_rfc3339(&recorded_at_str)
                .context("Invalid recorded_at")?
                .with_timezone(&Utc),
        })
    }

    fn row_to_trade(row: &SqliteRow) -> Result<Trade> {
        let id_str: String = row.get("id");
        let buyer_str: String = row.get("buyer_id");
        let event_str: String = row.get("event_id");
        let slot: i64 = row.get("slot");
        let timestamp_str: String = row.get("timestamp");

        Ok(Trade {
            id: Uuid::parse_str(&id_str).context("Invalid trade ID")?,
            buyer: Uuid::parse_str(&buyer_str).context("Invalid buyer ID")?,
            event: Uuid::parse_str(&event_str).context("Invalid event ID")?,
            amount: row.get("amount"),
            slot: Slot::try_from(slot).context("Invalid trade slot")?,
            timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                .context("Invalid timestamp")?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl AuditLog for SqliteAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        match record {
            AuditRecord::Vote(vote) => {
                sqlx::query(
                    r#"
                    INSERT INTO votes (id, participant_id, event_id, amount, timestamp, recorded_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(vote.id.to_string())
                .bind(vote.participant.to_string())
                .bind(vote.event.to_string())
                .bind(vote.amount)
                .bind(vote.timestamp.to_rfc3339())
                .bind(vote.recorded_at.to_rfc3339())
                .execute(&self.pool)
                .await
                .context("Failed to append vote")?;
            }
            AuditRecord::Trade(trade) => {
                sqlx::query(
                    r#"
                    INSERT INTO trades (id, buyer_id, event_id, amount, slot, timestamp)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(trade.id.to_string())
                .bind(trade.buyer.to_string())
                .bind(trade.event.to_string())
                .bind(trade.amount)
                .bind(i64::from(trade.slot))
                .bind(trade.timestamp.to_rfc3339())
                .execute(&self.pool)
                .await
                .context("Failed to append trade")?;
            }
        }
        Ok(())
    }

    async fn votes(&self) -> Result<Vec<Vote>> {
        let rows = sqlx::query(
            r#"
            SELECT id, participant_id, event_id, amount, timestamp, recorded_at
            FROM votes
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list votes")?;

        rows.iter().map(Self::row_to_vote).collect()
    }

    async fn trades(&self) -> Result<Vec<Trade>> {
        let rows = sqlx::query(
            r#"
            SELECT id, buyer_id, event_id, amount, slot, timestamp
            FROM trades
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list trades")?;

        rows.iter().map(Self::row_to_trade).collect()
    }
}

/// In-process audit log, for embedding and tests.
#[derive(Default, Clone)]
pub struct MemoryAuditLog {
    records: Arc<RwLock<Vec<AuditRecord>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn votes(&self) -> Result<Vec<Vote>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter_map(|r| match r {
                AuditRecord::Vote(vote) => Some(vote.clone()),
                AuditRecord::Trade(_) => None,
            })
            .collect())
    }

    async fn trades(&self) -> Result<Vec<Trade>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter_map(|r| match r {
                AuditRecord::Trade(trade) => Some(trade.clone()),
                AuditRecord::Vote(_) => None,
            })
            .collect())
    }
}
