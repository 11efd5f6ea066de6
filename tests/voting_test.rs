mod common;

use anyhow::Result;
use chrono::Utc;
use common::{StandardBoard, parse_date, test_service};
use rankboard::application::{AppError, Resource};
use rankboard::domain::CandidateEvent;
use uuid::Uuid;

#[tokio::test]
async fn test_vote_moves_credits_to_event() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create(&service).await?;

    service
        .cast_vote(board.mike.id, board.first.id, 1, Utc::now())
        .await?;

    assert_eq!(service.participant(board.mike.id).await?.balance, 19);
    assert_eq!(service.event(board.first.id).await?.score, 1);

    Ok(())
}

#[tokio::test]
async fn test_vote_conserves_balance_plus_score() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create(&service).await?;

    for amount in [3, 5, 2] {
        let before = service.participant(board.mike.id).await?.balance
            + service.event(board.second.id).await?.score;

        service
            .cast_vote(board.mike.id, board.second.id, amount, Utc::now())
            .await?;

        let mike = service.participant(board.mike.id).await?;
        let second = service.event(board.second.id).await?;
        assert_eq!(mike.balance + second.score, before);
    }

    assert_eq!(service.participant(board.mike.id).await?.balance, 10);
    assert_eq!(service.event(board.second.id).await?.score, 10);

    Ok(())
}

#[tokio::test]
async fn test_vote_can_spend_entire_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create(&service).await?;

    service
        .cast_vote(board.jane.id, board.third.id, 10, Utc::now())
        .await?;

    assert_eq!(service.participant(board.jane.id).await?.balance, 0);

    let result = service
        .cast_vote(board.jane.id, board.third.id, 1, Utc::now())
        .await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientBalance {
            balance: 0,
            required: 1,
            ..
        })
    ));

    Ok(())
}

#[tokio::test]
async fn test_vote_over_balance_changes_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create(&service).await?;

    let result = service
        .cast_vote(board.jane.id, board.first.id, 11, Utc::now())
        .await;

    match result {
        Err(AppError::InsufficientBalance {
            participant,
            balance,
            required,
        }) => {
            assert_eq!(participant, board.jane.id);
            assert_eq!(balance, 10);
            assert_eq!(required, 11);
        }
        other => panic!("expected InsufficientBalance, got {:?}", other),
    }

    assert_eq!(service.participant(board.jane.id).await?.balance, 10);
    assert_eq!(service.event(board.first.id).await?.score, 0);
    assert!(service.votes().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_vote_unknown_participant() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create(&service).await?;
    let ghost = Uuid::new_v4();

    let result = service.cast_vote(ghost, board.first.id, 1, Utc::now()).await;

    assert!(matches!(
        result,
        Err(AppError::NotFound(Resource::Participant(id))) if id == ghost
    ));
    assert_eq!(service.event(board.first.id).await?.score, 0);
    assert!(service.votes().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_vote_unknown_event() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create(&service).await?;
    let ghost = Uuid::new_v4();

    let result = service.cast_vote(board.mike.id, ghost, 1, Utc::now()).await;

    assert!(matches!(
        result,
        Err(AppError::NotFound(Resource::Event(id))) if id == ghost
    ));
    assert_eq!(service.participant(board.mike.id).await?.balance, 20);

    Ok(())
}

#[tokio::test]
async fn test_vote_requires_positive_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create(&service).await?;

    for amount in [0, -3] {
        let result = service
            .cast_vote(board.mike.id, board.first.id, amount, Utc::now())
            .await;
        assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    }

    assert_eq!(service.participant(board.mike.id).await?.balance, 20);
    assert!(service.votes().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_vote_is_recorded_with_caller_timestamp() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create(&service).await?;
    let cast_at = parse_date("2024-01-15");

    let vote = service
        .cast_vote(board.mike.id, board.first.id, 3, cast_at)
        .await?;

    let votes = service.votes().await?;
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].id, vote.id);
    assert_eq!(votes[0].participant, board.mike.id);
    assert_eq!(votes[0].event, board.first.id);
    assert_eq!(votes[0].amount, 3);
    assert_eq!(votes[0].timestamp, cast_at);

    Ok(())
}

#[tokio::test]
async fn test_votes_for_event_filters_audit_trail() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create(&service).await?;

    service
        .cast_vote(board.mike.id, board.first.id, 2, Utc::now())
        .await?;
    service
        .cast_vote(board.jane.id, board.first.id, 4, Utc::now())
        .await?;
    service
        .cast_vote(board.jane.id, board.second.id, 1, Utc::now())
        .await?;

    let first_votes = service.votes_for_event(board.first.id).await?;
    assert_eq!(first_votes.len(), 2);
    assert_eq!(first_votes.iter().map(|v| v.amount).sum::<i64>(), 6);
    assert_eq!(service.event(board.first.id).await?.score, 6);

    let info = service.event_info(board.second.id).await?;
    assert_eq!(info.votes.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_vote_that_would_overflow_score_changes_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let board = StandardBoard::create_with_slot(&service, 1).await?;
    service
        .purchase_slot(
            board.jane.id,
            1,
            1,
            CandidateEvent::new("ForthEvent", "Entertainment").with_initial_score(i64::MAX),
        )
        .await?;

    let result = service
        .cast_vote(board.mike.id, board.first.id, 1, Utc::now())
        .await;

    match result {
        Err(err @ AppError::InvalidAmount(_)) => assert!(!err.is_retryable()),
        other => panic!("expected InvalidAmount, got {other:?}"),
    }
    assert_eq!(service.participant(board.mike.id).await?.balance, 20);
    assert_eq!(service.event(board.first.id).await?.score, i64::MAX);
    assert!(service.votes().await?.is_empty());

    Ok(())
}
