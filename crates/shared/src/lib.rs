//! Wire and domain types shared by the payroll console crates.

pub mod domain;
pub mod error;
pub mod protocol;
