//! Transactions: the only way documents change.

mod history;
mod mapping;
mod step;
mod transaction;

pub use history::{History, HistoryEntry};
pub use mapping::{MapRange, MapResult, Mapping, StepMap};
pub use step::{Step, StepResult};
pub use transaction::{Applied, HistoryAction, Transaction};
