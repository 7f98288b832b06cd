//! Background Tasks Module
//!
//! Contains background tasks that run periodically during service operation.
//!
//! # Tasks
//! - Eviction: sweeps the resource cache back under budget at a fixed interval

mod eviction;

pub use eviction::spawn_eviction_task;
