#![forbid(unsafe_code)]

pub mod query;
pub mod repo;
pub mod store;
