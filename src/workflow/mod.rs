//! User-triggered workflows over the entity store

pub mod busy;
pub mod conversations;
pub mod summaries;

pub use busy::{BusyFlags, BusyGuard, OperationKind};
