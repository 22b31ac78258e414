/// Runtime key indexes built during validation pass 2.
///
/// A [`KeyIndex`] collects the composite keys of one key definition from a
/// section list in the validated document. Each composite key is an ordered
/// tuple of textual components (stringified text or integer values, or the
/// empty placeholder for absent components). Key constraints then test
/// membership against the indexes in scope.
use std::collections::HashSet;

use crate::name::Name;
use crate::rule::CaseSensitivity;

/// A set of composite keys collected from one section list.
#[derive(Debug)]
pub struct KeyIndex {
    /// The index name; empty indexes are validated but never referenced.
    name: Name,
    /// Case sensitivity applied to all components.
    case_sensitivity: CaseSensitivity,
    /// The number of components per composite key.
    arity: usize,
    /// The folded composite keys, joined by comma.
    full_keys: HashSet<String>,
    /// The folded components, one set per column.
    columns: Vec<HashSet<String>>,
}

impl KeyIndex {
    /// Creates an empty index.
    pub fn new(name: Name, case_sensitivity: CaseSensitivity, arity: usize) -> Self {
        Self {
            name,
            case_sensitivity,
            arity,
            full_keys: HashSet::new(),
            columns: vec![HashSet::new(); arity],
        }
    }

    /// Returns the name of this index.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the number of components per composite key.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the number of composite keys collected.
    pub fn len(&self) -> usize {
        self.full_keys.len()
    }

    /// Returns `true` if no composite key was collected.
    pub fn is_empty(&self) -> bool {
        self.full_keys.is_empty()
    }

    /// Inserts a composite key.
    ///
    /// Returns `false` if an equal tuple already exists. Component counts
    /// other than the arity are rejected the same way.
    pub fn try_add_key(&mut self, components: &[String]) -> bool {
        if components.len() != self.arity {
            return false;
        }
        let folded: Vec<String> = components
            .iter()
            .map(|component| self.case_sensitivity.folded(component))
            .collect();
        if !self.full_keys.insert(folded.join(",")) {
            return false;
        }
        for (column, component) in self.columns.iter_mut().zip(folded) {
            column.insert(component);
        }
        true
    }

    /// Tests a single component against one column of the index.
    pub fn has_component(&self, text: &str, column: usize) -> bool {
        let Some(column) = self.columns.get(column) else {
            return false;
        };
        column.contains(&self.case_sensitivity.folded(text))
    }

    /// Tests a full composite key. For single-component indexes this is the
    /// component itself; for multi-component indexes the tested text must be
    /// the comma-joined tuple.
    pub fn has_key(&self, text: &str) -> bool {
        self.full_keys.contains(&self.case_sensitivity.folded(text))
    }
}
