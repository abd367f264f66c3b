//! Core types and utilities

pub mod types;
pub mod error;
pub mod logging;
pub mod config;
pub mod events;
pub mod pool;
pub mod session;

pub use types::*;
pub use error::Error;
