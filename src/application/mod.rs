// Application layer - the board's use cases.
// VotingService and RankTradingService hold the transactional rules;
// BoardService wires them to storage for the CLI and other callers.

pub mod error;
mod service;
mod trading;
mod voting;

pub use error::*;
pub use service::*;
pub use trading::*;
pub use voting::*;
