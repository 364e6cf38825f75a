//! Template catalogue
//!
//! Registered knowledge about installer families: for each family tag
//! (e.g. `"fomod"`, `"simple"`), the instruction templates the reverse
//! solver may try against an archive of that family. Templates are added by
//! registration, never discovered dynamically.

use std::collections::BTreeMap;

use crate::options::InstructionTemplate;

/// Catalogue of instruction templates keyed by installer family.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalogue {
    families: BTreeMap<String, Vec<InstructionTemplate>>,
}

impl TemplateCatalogue {
    /// Create an empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under a family tag. Order of registration is the
    /// order the solver tries templates within the family.
    pub fn register(&mut self, family: impl Into<String>, template: InstructionTemplate) {
        self.families.entry(family.into()).or_default().push(template);
    }

    /// Templates registered for a family, in registration order.
    pub fn templates(&self, family: &str) -> &[InstructionTemplate] {
        self.families.get(family).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorted list of known family tags.
    pub fn families(&self) -> Vec<&str> {
        self.families.keys().map(String::as_str).collect()
    }

    /// Total number of registered templates across families.
    pub fn len(&self) -> usize {
        self.families.values().map(Vec::len).sum()
    }

    /// Whether no template is registered.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
