//! State store for the quota engine: a SlateDB key-value store, the event log
//! that feeds controllers, and typed read-through listers.

pub mod client;
mod lock;
pub mod lister;
pub mod watch;
