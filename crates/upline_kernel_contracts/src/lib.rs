#![forbid(unsafe_code)]

pub mod common;
pub mod member;
pub mod payout;
pub mod sale;

pub use common::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};
