use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;

use crate::application::BoardService;
use crate::domain::{Event, Participant, Trade, Vote, format_price};

/// Full board snapshot for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub participants: Vec<Participant>,
    pub events: Vec<Event>,
    pub votes: Vec<Vote>,
    pub trades: Vec<Trade>,
}

/// Writes board data and its audit trail out as CSV or JSON
pub struct Exporter<'a> {
    service: &'a BoardService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a BoardService) -> Self {
        Self { service }
    }

    async fn participant_names(&self) -> Result<HashMap<uuid::Uuid, String>> {
        let participants = self.service.list_participants().await?;
        Ok(participants.into_iter().map(|p| (p.id, p.name)).collect())
    }

    /// Export the vote audit trail to CSV
    pub async fn export_votes_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let votes = self.service.votes().await?;
        let names = self.participant_names().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "participant",
            "event_id",
            "amount",
            "timestamp",
            "recorded_at",
        ])?;

        for vote in &votes {
            csv_writer.write_record([
                vote.id.to_string(),
                names.get(&vote.participant).cloned().unwrap_or_default(),
                vote.event.to_string(),
                vote.amount.to_string(),
                vote.timestamp.to_rfc3339(),
                vote.recorded_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(votes.len())
    }

    /// Export the trade audit trail to CSV
    pub async fn export_trades_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let trades = self.service.trades().await?;
        let names = self.participant_names().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "buyer", "event_id", "slot", "amount", "timestamp"])?;

        for trade in &trades {
            csv_writer.write_record([
                trade.id.to_string(),
                names.get(&trade.buyer).cloned().unwrap_or_default(),
                trade.event.to_string(),
                trade.slot.to_string(),
                format_price(trade.amount),
                trade.timestamp.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(trades.len())
    }

    /// Export the whole board as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<BoardSnapshot> {
        let snapshot = BoardSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            participants: self.service.list_participants().await?,
            events: self.service.board().await?,
            votes: self.service.votes().await?,
            trades: self.service.trades().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
