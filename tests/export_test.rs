mod common;

use anyhow::Result;
use common::{StandardBoard, parse_date, test_service};
use rankboard::domain::CandidateEvent;
use rankboard::io::export::{BoardSnapshot, Exporter};

#[tokio::test]
async fn test_export_votes_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create(&service).await?;

    service
        .cast_vote(board.mike.id, board.first.id, 3, parse_date("2024-03-01"))
        .await?;
    service
        .cast_vote(board.jane.id, board.second.id, 2, parse_date("2024-03-02"))
        .await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service).export_votes_csv(&mut buffer).await?;
    assert_eq!(count, 2);

    let output = String::from_utf8(buffer)?;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,participant,event_id,amount"));
    assert!(lines[1].contains(",Mike,"));
    assert!(lines[1].contains(&board.first.id.to_string()));
    assert!(lines[2].contains(",Jane,"));

    Ok(())
}

#[tokio::test]
async fn test_export_trades_csv_formats_prices() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create_with_slot(&service, 1).await?;

    service
        .purchase_slot(
            board.jane.id,
            1,
            12_550,
            CandidateEvent::new("ForthEvent", "Economy"),
        )
        .await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service)
        .export_trades_csv(&mut buffer)
        .await?;
    // seed + purchase
    assert_eq!(count, 2);

    let output = String::from_utf8(buffer)?;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "id,buyer,event_id,slot,amount,timestamp");
    assert!(lines[1].contains(",Mike,"));
    assert!(lines[1].contains(",1,0.00,"));
    assert!(lines[2].contains(",Jane,"));
    assert!(lines[2].contains(",1,125.50,"));

    Ok(())
}

#[tokio::test]
async fn test_export_full_json_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create_with_slot(&service, 1).await?;
    service
        .cast_vote(board.mike.id, board.second.id, 5, parse_date("2024-03-01"))
        .await?;

    let mut buffer = Vec::new();
    let snapshot = Exporter::new(&service).export_full_json(&mut buffer).await?;
    assert_eq!(snapshot.participants.len(), 2);
    assert_eq!(snapshot.events.len(), 3);
    assert_eq!(snapshot.votes.len(), 1);
    assert_eq!(snapshot.trades.len(), 1);

    let parsed: BoardSnapshot = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed.version, env!("CARGO_PKG_VERSION"));
    // slotted events come first
    assert_eq!(parsed.events[0].id, board.first.id);
    assert_eq!(parsed.events[0].rank_slot, Some(1));

    Ok(())
}
