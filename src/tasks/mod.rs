//! Background Tasks Module
//!
//! Contains the bounded worker pool that runs cache rebuilds and the
//! periodic sweeper for the in-memory backend.

mod rebuild;
mod sweeper;

pub use rebuild::RebuildPool;
pub use sweeper::spawn_sweeper_task;
