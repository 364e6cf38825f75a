//! Content identity and filesystem scanning for Provenance Manager
//!
//! Provides the universal key type for the whole workspace (`ContentHash`),
//! normalized relative paths (`RelPath`), a stat-validated hash cache
//! (`IdentityCache`), and the parallel tree scan that feeds drift
//! classification.

pub mod error;
pub mod hash;
pub mod identity;
pub mod io;
pub mod path;
pub mod scan;

pub use error::{Error, Result};
pub use hash::{ContentHash, hash_bytes, hash_file};
pub use identity::IdentityCache;
pub use path::RelPath;
pub use scan::{Completion, FileRecord, ScanOptions, ScanOutcome, scan_tree};
