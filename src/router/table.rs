//! Compiled route table: the unit the route cache persists.

use serde::{Deserialize, Serialize};

use super::route::CompiledPattern;

/// One compiled route, pointing back at its registration index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledEntry {
    /// Position of the route in the collection
    pub index: usize,
    /// Upper-case method names
    pub methods: Vec<String>,
    /// The template as registered
    pub pattern: String,
    /// Anchored regex source
    pub regex: String,
    /// Parameter names in capture order
    pub params: Vec<String>,
}

/// Serializable snapshot of a compiled [`RouteCollection`](super::RouteCollection)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledTable {
    /// Fingerprint of the collection the table was built from
    pub fingerprint: String,
    /// Entries in registration order
    pub entries: Vec<CompiledEntry>,
}

/// In-memory form of a [`CompiledTable`] with live regexes
#[derive(Debug)]
pub(crate) struct LoadedTable {
    pub(crate) fingerprint: String,
    pub(crate) entries: Vec<LoadedEntry>,
}

#[derive(Debug)]
pub(crate) struct LoadedEntry {
    pub(crate) index: usize,
    pub(crate) methods: Vec<String>,
    pub(crate) matcher: CompiledPattern,
}

impl LoadedEntry {
    #[inline]
    pub(crate) fn matches_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}

impl LoadedTable {
    /// Rebuild matchers from a stored table
    pub(crate) fn from_compiled(table: CompiledTable) -> Result<Self, regex::Error> {
        let entries = table
            .entries
            .into_iter()
            .map(|entry| {
                Ok(LoadedEntry {
                    index: entry.index,
                    matcher: CompiledPattern::from_source(&entry.regex, &entry.params)?,
                    methods: entry.methods,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            fingerprint: table.fingerprint,
            entries,
        })
    }
}
