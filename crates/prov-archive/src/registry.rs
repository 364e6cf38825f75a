//! Plugin registry
//!
//! Maps a discriminator — archive format tag or tool id — to a registered
//! implementation. New formats and tools are added by registering into this
//! table; there is no dynamic discovery.

use std::collections::HashMap;
use std::sync::Arc;

use crate::plugin::{ArchiveReader, ToolRunner};
use crate::{Error, Result};

/// Registry of archive readers and tool runners.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    readers: HashMap<String, Arc<dyn ArchiveReader>>,
    tools: HashMap<String, Arc<dyn ToolRunner>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an archive reader for a format tag (normally the file
    /// extension, e.g. `"7z"`). Replaces any previous registration.
    pub fn register_reader(&mut self, format: impl Into<String>, reader: Arc<dyn ArchiveReader>) {
        self.readers.insert(format.into().to_lowercase(), reader);
    }

    /// Register a tool runner under a tool id.
    pub fn register_tool(&mut self, tool_id: impl Into<String>, runner: Arc<dyn ToolRunner>) {
        self.tools.insert(tool_id.into(), runner);
    }

    /// Look up the reader for a format tag.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFormat` if no reader is registered.
    pub fn reader(&self, format: &str) -> Result<&Arc<dyn ArchiveReader>> {
        self.readers
            .get(&format.to_lowercase())
            .ok_or_else(|| Error::UnknownFormat {
                format: format.to_string(),
            })
    }

    /// Look up a tool runner by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownTool` if no runner is registered.
    pub fn tool(&self, tool_id: &str) -> Result<&Arc<dyn ToolRunner>> {
        self.tools.get(tool_id).ok_or_else(|| Error::UnknownTool {
            tool: tool_id.to_string(),
        })
    }

    /// Whether a reader is registered for a format tag.
    pub fn has_reader(&self, format: &str) -> bool {
        self.readers.contains_key(&format.to_lowercase())
    }

    /// Sorted list of registered format tags.
    pub fn formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.readers.keys().cloned().collect();
        formats.sort();
        formats
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("formats", &self.formats())
            .field("tools", &self.tools.len())
            .finish()
    }
}
