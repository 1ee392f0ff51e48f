//! Configuration module for TreeFind
//!
//! Search configurations, CLI arguments, and their defaults.

mod settings;

pub use settings::*;
