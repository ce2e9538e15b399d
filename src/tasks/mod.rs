//! Background Tasks Module
//!
//! # Tasks
//! - Cache population: applies detached cache populates and evictions per table
//! - Health check: pings the database at a configured interval

mod health;
mod populate;

pub use health::spawn_health_check;
pub use populate::{CacheJob, CacheWorker};
