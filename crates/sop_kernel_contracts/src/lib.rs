#![forbid(unsafe_code)]

pub mod common;
pub mod sop;
pub mod sopgen;

pub use common::{ContractViolation, Validate};
