use serde::{Serialize, Serializer};
use std::fmt;

/// Indian states with a dedicated reference corpus, in catalog order.
///
/// Catalog order is the order states are reported in, regardless of the
/// order they were mentioned in a query.
pub const STATE_CATALOG: [&str; 28] = [
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chhattisgarh",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
];

/// Suffix of every per-state corpus file: `"<State>_training_corpus.txt"`.
pub const CORPUS_FILE_SUFFIX: &str = "_training_corpus.txt";

/// A state from [`STATE_CATALOG`].
///
/// Only obtainable through catalog lookups, so every `StateName` in a table
/// or intent is known to be valid. Ordering follows the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateName(usize);

impl StateName {
    /// Look up a state by name, ignoring case and surrounding/inner whitespace runs.
    pub fn lookup(name: &str) -> Option<StateName> {
        let wanted = normalize(name);
        STATE_CATALOG
            .iter()
            .position(|candidate| normalize(candidate) == wanted)
            .map(StateName)
    }

    /// All catalog states, in catalog order.
    pub fn all() -> impl Iterator<Item = StateName> {
        (0..STATE_CATALOG.len()).map(StateName)
    }

    pub fn name(&self) -> &'static str {
        STATE_CATALOG[self.0]
    }

    /// File name of this state's reference corpus.
    pub fn corpus_file_name(&self) -> String {
        format!("{}{}", self.name(), CORPUS_FILE_SUFFIX)
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for StateName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
