//! Core traversal engine
//!
//! Provides the bounded result queue, the background walkers and the two
//! finders that drive them.

mod directory_walker;
mod file_finder;
mod file_walker;
mod finder;
pub mod hooks;
pub mod queue;
mod runtime;
mod worker;

pub use file_finder::*;
pub use finder::*;
pub use hooks::{ErrorHook, FoundHook, SearchCounters};
pub use queue::{BoundedItemQueue, QueueClosed, QueueProducer, QueueStats};
pub use runtime::{FinderState, SearchStats};
pub use worker::RunningFlag;
