//! CLI command implementations

pub mod check;
pub mod run;
pub mod status;
