use std::sync::OnceLock;

pub static MAX_PERMITS_THREADS: OnceLock<usize> = OnceLock::new();

// Entries a single thread is expected to chew through before another thread pays off
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

pub const DEFAULT_TASKS_PER_THREAD: usize = 8;

pub const DEFAULT_MAX_CONCURRENT_SELECTIONS: usize = 16;

pub mod core;

pub mod configuration;

pub use crate::core::error::{Result, SelectError};
pub use crate::core::select::{select, select_async, Selector};
