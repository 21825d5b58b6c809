#![forbid(unsafe_code)]

pub mod commission;
pub mod validation;
