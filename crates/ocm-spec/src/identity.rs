use std::collections::BTreeMap;
use std::fmt;

/// An ordered mapping of string key to string value, used as a globally unique
/// handle for components, resources, sources and references.
///
/// Keys are always kept sorted: equality, hashing and the canonical string form
/// all derive from the same `BTreeMap`, so two identities built from the same
/// key/value pairs (in any order) compare equal and canonicalize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(BTreeMap<String, String>);

/// The two identity keys every component carries; every other key is
/// "extra identity" and only ever appears on elements, never on components.
pub const NAME_KEY: &str = "name";
pub const VERSION_KEY: &str = "version";

impl Identity {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn component(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::from_pairs([(NAME_KEY, name.into()), (VERSION_KEY, version.into())])
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME_KEY)
    }

    pub fn version(&self) -> Option<&str> {
        self.get(VERSION_KEY)
    }

    /// The stable alphabetical `k=v,k=v,...` form used as the DAG vertex id and
    /// for deterministic logging.
    pub fn canonical_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}
