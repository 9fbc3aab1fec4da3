//! Immutable variable assignments.
//!
//! A [`State`] maps variable names to discrete values. It is used as the key
//! of class-configuration posteriors and as a partial assignment for dataset
//! queries, so equality and hashing are structural and the hash is computed
//! once at construction.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable assignment of discrete values to named variables.
///
/// Entries are kept sorted by variable name, so two states built from the
/// same pairs in different orders are equal and hash identically.
#[derive(Clone, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<String, String>",
    from = "BTreeMap<String, String>"
)]
pub struct State {
    entries: Vec<(String, String)>,
    hash: u64,
}

impl State {
    /// Build a state from `(variable, value)` pairs.
    ///
    /// When a variable appears more than once the last value wins.
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from(map)
    }

    /// The empty assignment.
    pub fn empty() -> Self {
        Self::from(BTreeMap::new())
    }

    /// Value assigned to `variable`, if any.
    pub fn get(&self, variable: &str) -> Option<&str> {
        self.entries
            .binary_search_by(|(name, _)| name.as_str().cmp(variable))
            .ok()
            .map(|idx| self.entries[idx].1.as_str())
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.get(variable).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(variable, value)` pairs in variable-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Variable names in sorted order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// A new state with `variable` set to `value`.
    pub fn with(&self, variable: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map: BTreeMap<String, String> = self.entries.iter().cloned().collect();
        map.insert(variable.into(), value.into());
        Self::from(map)
    }

    /// Restrict the state to the given variables. Unknown names are ignored.
    pub fn project<S: AsRef<str>>(&self, variables: &[S]) -> Self {
        let map: BTreeMap<String, String> = self
            .entries
            .iter()
            .filter(|(name, _)| variables.iter().any(|v| v.as_ref() == name))
            .cloned()
            .collect();
        Self::from(map)
    }

    /// True when every variable assigned in `partial` has the same value here.
    pub fn satisfies(&self, partial: &State) -> bool {
        partial
            .iter()
            .all(|(name, value)| self.get(name) == Some(value))
    }
}

impl From<BTreeMap<String, String>> for State {
    fn from(map: BTreeMap<String, String>) -> Self {
        let entries: Vec<(String, String)> = map.into_iter().collect();
        let mut hasher = DefaultHasher::new();
        entries.hash(&mut hasher);
        State {
            hash: hasher.finish(),
            entries,
        }
    }
}

impl From<State> for BTreeMap<String, String> {
    fn from(state: State) -> Self {
        state.entries.into_iter().collect()
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.entries == other.entries
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}
