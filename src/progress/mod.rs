//! Progress reporting module
//!
//! A monotonic progress estimate shared between walkers and callers, and a
//! spinner used by the CLI.

mod estimate;
mod reporter;

pub use estimate::*;
pub use reporter::*;
