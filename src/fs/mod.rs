//! File system side of the finders
//!
//! Item types, single-level directory listing, and the comparers used to
//! filter what the walkers publish.

pub mod comparer;
mod item;
pub mod listing;

pub use comparer::{Comparer, ComparerSet, ExtensionFilter, HiddenFilter, NameMask, SizeRange};
pub use item::*;
pub use listing::{list_files, list_subdirectories, resolve_base, ListedFile, Listing};
