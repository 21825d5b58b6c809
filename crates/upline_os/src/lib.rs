#![forbid(unsafe_code)]

pub mod coordinator;
pub mod error;
pub mod hierarchy;
pub mod members;
pub mod payouts;
pub mod reporting;
pub mod runtime;
pub mod sales;

pub use coordinator::{FailureKind, SaleReceipt, SaleWithPayoutsOutcome, UnitFailure};
pub use error::UplineError;
pub use runtime::{UplineRuntime, UplineWiringConfig};
