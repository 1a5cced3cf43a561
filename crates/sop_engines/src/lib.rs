#![forbid(unsafe_code)]

pub mod sopgen;
