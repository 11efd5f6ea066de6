mod amount;
mod event;
mod integrity;
mod participant;
mod trade;
mod vote;

pub use amount::*;
pub use event::*;
pub use integrity::*;
pub use participant::*;
pub use trade::*;
pub use vote::*;
