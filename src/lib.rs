//! # TreeFind - Background Filesystem Traversal
//!
//! TreeFind enumerates directories and files beneath a base path on
//! background threads and hands the results to callers through bounded
//! queues. Callers pull results at their own pace; walkers block when the
//! queue is full.
//!
//! ## Features
//!
//! - **Directory search**: one worker, root-first or deepest-first order
//! - **File search**: two-stage pipeline so files stream before the whole tree is known
//! - **Backpressure**: bounded queues with independent capacities per stage
//! - **Filtering**: glob name masks, hidden-entry filter, extension and size filters, custom comparers
//! - **Hooks**: found and error callbacks invoked on the worker threads
//! - **Prompt shutdown**: closing a finder wakes every blocked caller and worker
//!
//! ## Quick Start
//!
//! ```no_run
//! use treefind::DirectoryFinder;
//!
//! let finder = DirectoryFinder::builder("/data").mask("src*").start().unwrap();
//!
//! while let Some(dir) = finder.get_next(None) {
//!     println!("{}", dir.path.display());
//! }
//! ```
//!
//! ## File Search with Hooks
//!
//! ```no_run
//! use treefind::{FileFinder, FindError};
//!
//! let finder = FileFinder::builder("/projects")
//!     .file_mask("*.rs;*.toml")
//!     .include_hidden(false)
//!     .directory_capacity(128)
//!     .file_capacity(1024)
//!     .on_error(|e: &FindError| eprintln!("skipped: {}", e))
//!     .start()
//!     .unwrap();
//!
//! let mut tick = || eprint!(".");
//! while let Some(file) = finder.get_next(Some(&mut tick)) {
//!     println!("{} {}", file.size, file.relative_path.display());
//! }
//!
//! let stats = finder.stats();
//! println!("{} files in {} directories", stats.files_seen, stats.directories_processed);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod progress;

// Re-export commonly used types
pub use config::{DirectorySearchConfig, FileSearchConfig, TraversalOrder};
pub use core::{DirectoryFinder, DirectoryFinderBuilder, FileFinder, FileFinderBuilder, FinderState, SearchStats};
pub use error::{FindError, Result};
pub use fs::{DirectoryItem, Entry, FileItem};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use treefind::prelude::*;
    //! ```

    pub use crate::config::{DirectorySearchConfig, FileSearchConfig, TraversalOrder};
    pub use crate::core::{
        BoundedItemQueue, DirectoryFinder, ErrorHook, FileFinder, FinderState, FoundHook, SearchStats,
    };
    pub use crate::error::{FindError, Result};
    pub use crate::fs::{Comparer, DirectoryItem, Entry, ExtensionFilter, FileItem, HiddenFilter, NameMask, SizeRange};
    pub use crate::progress::{ProgressEstimate, SearchProgress};
}
