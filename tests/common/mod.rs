// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rankboard::application::BoardService;
use rankboard::config::Config;
use rankboard::domain::{Event, Participant, Slot};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BoardService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let config = Config::for_database(temp_dir.path().join("test.db"));
    let service = BoardService::init(&config).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: a small hot-search board
pub struct StandardBoard {
    pub mike: Participant,
    pub jane: Participant,
    pub first: Event,
    pub second: Event,
    pub third: Event,
}

impl StandardBoard {
    /// Two participants (Mike: 20 credits, Jane: 10) and three unslotted events
    pub async fn create(service: &BoardService) -> Result<Self> {
        let mike = service.register_participant("Mike".into(), 20).await?;
        let jane = service.register_participant("Jane".into(), 10).await?;
        let first = service
            .create_event("FirstEvent".into(), "Economy".into())
            .await?;
        let second = service
            .create_event("SecondEvent".into(), "Politics".into())
            .await?;
        let third = service
            .create_event("ThirdEvent".into(), "Sports".into())
            .await?;
        Ok(Self {
            mike,
            jane,
            first,
            second,
            third,
        })
    }

    /// Same board with FirstEvent seeded on `slot` by Mike
    pub async fn create_with_slot(service: &BoardService, slot: Slot) -> Result<Self> {
        let board = Self::create(service).await?;
        service
            .seed_slot(board.mike.id, board.first.id, slot)
            .await?;
        Ok(board)
    }
}

/// Every event currently bound to `slot`
pub async fn occupants_of(service: &BoardService, slot: Slot) -> Result<Vec<Event>> {
    Ok(service
        .board()
        .await?
        .into_iter()
        .filter(|e| e.rank_slot == Some(slot))
        .collect())
}
