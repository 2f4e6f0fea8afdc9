//! Infrastructure: configuration, logging, and service wiring.

pub mod config;
pub mod logging;
pub mod setup;
