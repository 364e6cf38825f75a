//! Archive manifests and plugin capability interfaces
//!
//! An `ArchiveManifest` identifies an archive's contents without requiring
//! the archive bytes to be present. Actual unarchiving, tool execution, and
//! the overwrite/VFS layer are external collaborators behind the traits in
//! [`plugin`], wired up through a [`registry::PluginRegistry`].

pub mod builder;
pub mod error;
pub mod manifest;
pub mod plugin;
pub mod registry;

pub use builder::manifest_for_archive;
pub use error::{Error, Result};
pub use manifest::{ArchiveEntry, ArchiveManifest};
pub use plugin::{ArchiveReader, OverwriteSink, RawEntry, ToolRunner};
pub use registry::PluginRegistry;
