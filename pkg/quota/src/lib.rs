//! Resource quota engine: usage evaluation, scope matching, the quota store,
//! admission enforcement and bounded waits on reconciled status.
//!
//! The reconciliation loop that writes `status.used` lives in
//! `pkg-controllers`; everything it needs to compute usage is here.

pub mod admission;
pub mod error;
pub mod evaluator;
pub mod resources;
pub mod scope;
pub mod store;
pub mod wait;

pub use admission::{Operation, QuotaAdmission};
pub use error::QuotaError;
pub use store::QuotaStore;
