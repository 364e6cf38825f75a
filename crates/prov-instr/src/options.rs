//! Option selections and instruction templates

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::doc::InstructionDocument;

/// A chosen value for every option an install run decides.
///
/// Backed by an ordered map so selections serialize stably and compare
/// structurally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSelections {
    choices: BTreeMap<String, String>,
}

impl OptionSelections {
    /// No selections; every option falls back to its default.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from (key, value) pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            choices: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The chosen value for an option, if any.
    pub fn get(&self, option: &str) -> Option<&str> {
        self.choices.get(option).map(String::as_str)
    }

    /// Set one selection, replacing any previous value.
    pub fn set(&mut self, option: impl Into<String>, value: impl Into<String>) {
        self.choices.insert(option.into(), value.into());
    }

    /// Number of selections.
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    /// Whether no selection was made.
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Iterate selections in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.choices.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The declared domain of one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSpec {
    /// Option key as referenced by `Step::SelectByOption`.
    pub key: String,
    /// Candidate values in search priority order (most common first).
    pub values: Vec<String>,
}

impl OptionSpec {
    pub fn new(key: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// An instruction document plus its enumerable option space.
///
/// Templates are what the reverse solver searches: `presets` are complete
/// selections known to be common (tried first), after which the cartesian
/// product of `options` is enumerated in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionTemplate {
    pub document: InstructionDocument,
    #[serde(default)]
    pub options: Vec<OptionSpec>,
    #[serde(default)]
    pub presets: Vec<OptionSelections>,
}

impl InstructionTemplate {
    /// A template with no options: one candidate, the empty selection.
    pub fn fixed(document: InstructionDocument) -> Self {
        Self {
            document,
            options: Vec::new(),
            presets: Vec::new(),
        }
    }

    /// All candidate selections in search priority order: presets first,
    /// then the full option-product enumeration.
    ///
    /// The enumeration is exhaustive over a finite space; duplicates of a
    /// preset are not filtered, the engine result is simply checked twice.
    pub fn candidates(&self) -> impl Iterator<Item = OptionSelections> + '_ {
        self.presets
            .iter()
            .cloned()
            .chain(ProductIter::new(&self.options))
    }

    /// Size of the enumerated option product (excluding presets).
    pub fn product_size(&self) -> usize {
        self.options.iter().map(|spec| spec.values.len()).product()
    }
}

/// Odometer iterator over the cartesian product of option values.
struct ProductIter<'a> {
    specs: &'a [OptionSpec],
    indices: Vec<usize>,
    done: bool,
}

impl<'a> ProductIter<'a> {
    fn new(specs: &'a [OptionSpec]) -> Self {
        // An option with an empty value list makes the product empty.
        let done = specs.iter().any(|s| s.values.is_empty());
        Self {
            specs,
            indices: vec![0; specs.len()],
            done,
        }
    }
}

impl Iterator for ProductIter<'_> {
    type Item = OptionSelections;

    fn next(&mut self) -> Option<OptionSelections> {
        if self.done {
            return None;
        }

        let mut selections = OptionSelections::none();
        for (spec, &idx) in self.specs.iter().zip(&self.indices) {
            selections.set(spec.key.clone(), spec.values[idx].clone());
        }

        // Advance the odometer, least significant digit last so the first
        // declared value of every option is tried before later ones.
        let mut pos = self.indices.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.indices[pos] += 1;
            if self.indices[pos] < self.specs[pos].values.len() {
                break;
            }
            self.indices[pos] = 0;
        }

        Some(selections)
    }
}
