//! Email backend implementations

pub mod console;
pub mod smtp;
