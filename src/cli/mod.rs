use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

use crate::application::BoardService;
use crate::config::{
    Config, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DATABASE, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_CONNECTIONS,
};
use crate::domain::{CandidateEvent, Event, ParticipantId, format_price, parse_price};

/// Rankboard - ranked events with vote credits and purchasable slots
#[derive(Parser)]
#[command(name = "rankboard")]
#[command(about = "A ranked-events board: vote with credits, buy rank slots")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "RANKBOARD_DB", default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// Maximum pooled database connections
    #[arg(long, env = "RANKBOARD_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// How long to wait for the write lock, in milliseconds
    #[arg(long, env = "RANKBOARD_BUSY_TIMEOUT_MS", default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    pub busy_timeout_ms: u64,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, env = "RANKBOARD_LOG", default_value = DEFAULT_LOG_FILTER, global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Participant management commands
    #[command(subcommand)]
    Participant(ParticipantCommands),

    /// Event management commands
    #[command(subcommand)]
    Event(EventCommands),

    /// Rank slot commands
    #[command(subcommand)]
    Slot(SlotCommands),

    /// Spend a participant's credits on an event
    Vote {
        /// Credits to spend
        amount: i64,

        /// Voting participant name
        #[arg(short, long)]
        participant: String,

        /// Event ID
        #[arg(short, long)]
        event: String,

        /// When the vote was cast (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Buy a rank slot for an event
    Buy {
        /// Price to pay (e.g., "100" or "100.00")
        amount: String,

        /// Buying participant name
        #[arg(short, long)]
        buyer: String,

        /// Slot number
        #[arg(short, long)]
        slot: u32,

        /// Name of the event to install
        #[arg(short, long)]
        name: String,

        /// Category of the event to install
        #[arg(short, long)]
        category: String,

        /// Score the installed event starts with
        #[arg(long, default_value_t = 0)]
        score: i64,

        /// Existing event ID to move into the slot (omit to rewrite the occupant)
        #[arg(long)]
        source: Option<String>,
    },

    /// Show the ranked board
    Board,

    /// List recorded votes
    Votes {
        /// Only votes for this event ID
        #[arg(long)]
        event: Option<String>,
    },

    /// List recorded slot trades
    Trades {
        /// Only trades for this slot
        #[arg(long)]
        slot: Option<u32>,
    },

    /// Verify board integrity
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: votes, trades, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ParticipantCommands {
    /// Register a participant
    Add {
        /// Participant name (must be unique)
        name: String,

        /// Opening credit balance
        #[arg(short, long, default_value_t = 10)]
        balance: i64,
    },

    /// List all participants
    List,

    /// Show participant details
    Show {
        /// Participant name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum EventCommands {
    /// Create an event
    Add {
        /// Event name
        name: String,

        /// Category (e.g., "Economy", "Entertainment")
        #[arg(short, long)]
        category: String,
    },

    /// Show event details
    Show {
        /// Event ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum SlotCommands {
    /// Put an event on a vacant slot at price zero
    Seed {
        /// Slot number
        slot: u32,

        /// Event ID
        #[arg(short, long)]
        event: String,

        /// Participant placing the event
        #[arg(short, long)]
        owner: String,
    },

    /// Show the current occupant and trade history of a slot
    Show {
        /// Slot number
        slot: u32,
    },
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            database: self.database.clone(),
            max_connections: self.max_connections,
            busy_timeout_ms: self.busy_timeout_ms,
            log_filter: self.log.clone(),
        }
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();

        match self.command {
            Commands::Init => {
                BoardService::init(&config).await?;
                println!("Database initialized: {}", config.database.display());
            }

            Commands::Participant(cmd) => {
                let service = BoardService::connect(&config).await?;
                run_participant_command(&service, cmd).await?;
            }

            Commands::Event(cmd) => {
                let service = BoardService::connect(&config).await?;
                run_event_command(&service, cmd).await?;
            }

            Commands::Slot(cmd) => {
                let service = BoardService::connect(&config).await?;
                run_slot_command(&service, cmd).await?;
            }

            Commands::Vote {
                amount,
                participant,
                event,
                date,
            } => {
                let service = BoardService::connect(&config).await?;
                let voter = service.participant_by_name(&participant).await?;
                let event_id = parse_id(&event)?;
                let timestamp = match date {
                    Some(date_str) => parse_date(&date_str).with_context(|| {
                        format!("Invalid date '{}'. Use YYYY-MM-DD or RFC 3339", date_str)
                    })?,
                    None => Utc::now(),
                };

                let vote = service
                    .cast_vote(voter.id, event_id, amount, timestamp)
                    .await?;
                let voter = service.participant(voter.id).await?;
                let event = service.event(event_id).await?;

                println!(
                    "Recorded vote: {} credits {} -> {} ({})",
                    vote.amount, voter.name, event.name, vote.id
                );
                println!(
                    "  {} has {} credits left, {} now has {}",
                    voter.name, voter.balance, event.name, event.score
                );
            }

            Commands::Buy {
                amount,
                buyer,
                slot,
                name,
                category,
                score,
                source,
            } => {
                let service = BoardService::connect(&config).await?;
                let buyer = service.participant_by_name(&buyer).await?;
                let price = parse_price(&amount)
                    .context("Invalid amount format. Use '100.00' or '100'")?;

                let mut candidate = CandidateEvent::new(name, category).with_initial_score(score);
                if let Some(source) = source {
                    candidate = candidate.with_source(parse_id(&source)?);
                }

                let trade = service
                    .purchase_slot(buyer.id, slot, price, candidate)
                    .await?;
                let event = service.event(trade.event).await?;

                println!(
                    "Bought slot {} for {}: {} ({})",
                    trade.slot,
                    format_price(trade.amount),
                    event.name,
                    trade.id
                );
            }

            Commands::Board => {
                let service = BoardService::connect(&config).await?;
                run_board_command(&service).await?;
            }

            Commands::Votes { event } => {
                let service = BoardService::connect(&config).await?;
                run_votes_command(&service, event).await?;
            }

            Commands::Trades { slot } => {
                let service = BoardService::connect(&config).await?;
                run_trades_command(&service, slot).await?;
            }

            Commands::Check => {
                let service = BoardService::connect(&config).await?;
                run_check_command(&service).await?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = BoardService::connect(&config).await?;
                run_export_command(&service, &export_type, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn run_participant_command(service: &BoardService, cmd: ParticipantCommands) -> Result<()> {
    match cmd {
        ParticipantCommands::Add { name, balance } => {
            let participant = service.register_participant(name, balance).await?;
            println!(
                "Registered participant: {} ({} credits, {})",
                participant.name, participant.balance, participant.id
            );
        }

        ParticipantCommands::List => {
            let participants = service.list_participants().await?;
            if participants.is_empty() {
                println!("No participants found.");
            } else {
                println!("{:<20} {:>10} ID", "NAME", "CREDITS");
                println!("{}", "-".repeat(68));
                for p in participants {
                    println!("{:<20} {:>10} {}", truncate(&p.name, 20), p.balance, p.id);
                }
            }
        }

        ParticipantCommands::Show { name } => {
            let participant = service.participant_by_name(&name).await?;
            let votes = service.votes().await?;
            let spent: i64 = votes
                .iter()
                .filter(|v| v.participant == participant.id)
                .map(|v| v.amount)
                .sum();

            println!("Participant: {}", participant.name);
            println!("  ID:       {}", participant.id);
            println!("  Credits:  {}", participant.balance);
            println!("  Spent:    {}", spent);
            println!(
                "  Joined:   {}",
                participant.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
    Ok(())
}

async fn run_event_command(service: &BoardService, cmd: EventCommands) -> Result<()> {
    match cmd {
        EventCommands::Add { name, category } => {
            let event = service.create_event(name, category).await?;
            println!("Created event: {} [{}] ({})", event.name, event.category, event.id);
        }

        EventCommands::Show { id } => {
            let info = service.event_info(parse_id(&id)?).await?;
            let event = &info.event;

            println!("Event: {}", event.name);
            println!("  ID:        {}", event.id);
            println!("  Category:  {}", event.category);
            println!("  Score:     {}", event.score);
            match event.rank_slot {
                Some(slot) => {
                    println!("  Slot:      {}", slot);
                    println!("  Price:     {}", format_price(event.purchase_price));
                }
                None => println!("  Slot:      -"),
            }
            if let Some(owner) = &info.owner {
                println!("  Owner:     {}", owner.name);
            }
            println!("  Votes:     {}", info.votes.len());
        }
    }
    Ok(())
}

async fn run_slot_command(service: &BoardService, cmd: SlotCommands) -> Result<()> {
    match cmd {
        SlotCommands::Seed { slot, event, owner } => {
            let owner = service.participant_by_name(&owner).await?;
            let trade = service.seed_slot(owner.id, parse_id(&event)?, slot).await?;
            println!("Seeded slot {} with event {}", trade.slot, trade.event);
        }

        SlotCommands::Show { slot } => {
            let occupant = service.occupant(slot).await?;
            let trades = service.trades_for_slot(slot).await?;
            let names = participant_names(service).await?;

            println!("Slot {}: {}", slot, occupant.name);
            println!("  Event:  {}", occupant.id);
            println!("  Price:  {}", format_price(occupant.purchase_price));
            if let Some(owner) = occupant.owner {
                println!("  Owner:  {}", name_of(&names, owner));
            }
            println!();
            println!("{:<20} {:>10} {:<20} EVENT", "DATE", "PRICE", "BUYER");
            println!("{}", "-".repeat(88));
            for trade in trades {
                println!(
                    "{:<20} {:>10} {:<20} {}",
                    trade.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    format_price(trade.amount),
                    truncate(name_of(&names, trade.buyer), 20),
                    trade.event
                );
            }
        }
    }
    Ok(())
}

async fn run_board_command(service: &BoardService) -> Result<()> {
    let events = service.board().await?;
    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }

    println!(
        "{:<5} {:<24} {:<16} {:>8} {:>10}",
        "RANK", "EVENT", "CATEGORY", "SCORE", "PRICE"
    );
    println!("{}", "-".repeat(67));
    for event in &events {
        print_board_row(event);
    }
    Ok(())
}

fn print_board_row(event: &Event) {
    let rank = event
        .rank_slot
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    let price = if event.is_slotted() {
        format_price(event.purchase_price)
    } else {
        String::new()
    };
    println!(
        "{:<5} {:<24} {:<16} {:>8} {:>10}",
        rank,
        truncate(&event.name, 24),
        truncate(&event.category, 16),
        event.score,
        price
    );
}

async fn run_votes_command(service: &BoardService, event: Option<String>) -> Result<()> {
    let votes = match event {
        Some(id) => service.votes_for_event(parse_id(&id)?).await?,
        None => service.votes().await?,
    };

    if votes.is_empty() {
        println!("No votes found.");
        return Ok(());
    }

    let names = participant_names(service).await?;
    println!("{:<20} {:>8} {:<20} EVENT", "DATE", "CREDITS", "PARTICIPANT");
    println!("{}", "-".repeat(86));
    for vote in votes {
        println!(
            "{:<20} {:>8} {:<20} {}",
            vote.timestamp.format("%Y-%m-%d %H:%M:%S"),
            vote.amount,
            truncate(name_of(&names, vote.participant), 20),
            vote.event
        );
    }
    Ok(())
}

async fn run_trades_command(service: &BoardService, slot: Option<u32>) -> Result<()> {
    let trades = match slot {
        Some(slot) => service.trades_for_slot(slot).await?,
        None => service.trades().await?,
    };

    if trades.is_empty() {
        println!("No trades found.");
        return Ok(());
    }

    let names = participant_names(service).await?;
    println!(
        "{:<20} {:>5} {:>10} {:<20} EVENT",
        "DATE", "SLOT", "PRICE", "BUYER"
    );
    println!("{}", "-".repeat(94));
    for trade in trades {
        println!(
            "{:<20} {:>5} {:>10} {:<20} {}",
            trade.timestamp.format("%Y-%m-%d %H:%M:%S"),
            trade.slot,
            format_price(trade.amount),
            truncate(name_of(&names, trade.buyer), 20),
            trade.event
        );
    }
    Ok(())
}

async fn run_check_command(service: &BoardService) -> Result<()> {
    println!("Checking board integrity...\n");

    let report = service.check_integrity().await?;

    println!("Participants: {}", report.participant_count);
    println!("Events:       {}", report.event_count);
    println!("Votes:        {}", report.vote_count);
    println!("Trades:       {}", report.trade_count);
    println!();

    if report.is_healthy() {
        println!("Board is consistent.");
        return Ok(());
    }

    println!("Issues found:");
    for id in &report.negative_balances {
        println!("  - participant {} has a negative balance", id);
    }
    for id in &report.negative_scores {
        println!("  - event {} has a negative score", id);
    }
    for slot in &report.contested_slots {
        println!("  - slot {} is held by more than one event", slot);
    }
    for id in &report.unbacked_slots {
        println!("  - event {} holds a slot without a matching trade", id);
    }
    anyhow::bail!("Board integrity check failed");
}

async fn run_export_command(
    service: &BoardService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::export::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create file: {}", path))?,
        ),
        None => Box::new(stdout()),
    };

    let count = match export_type {
        "votes" => exporter.export_votes_csv(writer).await?,
        "trades" => exporter.export_trades_csv(writer).await?,
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            snapshot.participants.len()
                + snapshot.events.len()
                + snapshot.votes.len()
                + snapshot.trades.len()
        }
        other => anyhow::bail!(
            "Unknown export type '{}'. Valid types: votes, trades, full",
            other
        ),
    };

    if let Some(path) = output {
        eprintln!("Exported {} records to {}", count, path);
    }
    Ok(())
}

async fn participant_names(service: &BoardService) -> Result<HashMap<ParticipantId, String>> {
    let participants = service.list_participants().await?;
    Ok(participants.into_iter().map(|p| (p.id, p.name)).collect())
}

fn name_of(names: &HashMap<ParticipantId, String>, id: ParticipantId) -> &str {
    names.get(&id).map(|s| s.as_str()).unwrap_or("?")
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn parse_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim()).with_context(|| format!("Invalid ID '{}'", input))
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .context("Invalid time of day")?
        .and_utc())
}
