//! Environment snapshots.
//!
//! A snapshot is the prefix-filtered view of the environment that a single
//! resolution works from. Keys are upper-cased and have the prefix stripped.

use std::collections::BTreeMap;

/// Immutable, prefix-stripped view of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the process environment under `prefix`.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process(prefix: &str) -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        Self::from_vars(vars, prefix)
    }

    /// Build a snapshot from arbitrary key/value pairs.
    ///
    /// Matching against `prefix` is case-insensitive. With an empty prefix
    /// every pair is kept. If two keys collapse to the same upper-cased
    /// name, the later one wins.
    pub fn from_vars<I, K, V>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let prefix = prefix.to_uppercase();
        let vars = vars
            .into_iter()
            .filter_map(|(key, value)| {
                let key = key.as_ref().to_uppercase();
                key.strip_prefix(prefix.as_str())
                    .map(|rest| (rest.to_string(), value.into()))
            })
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Layer `other` underneath this snapshot: keys already present here win.
    pub fn with_fallback(mut self, other: EnvSnapshot) -> Self {
        for (key, value) in other.vars {
            self.vars.entry(key).or_insert(value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_stripped_and_case_insensitive() {
        let snapshot = EnvSnapshot::from_vars(
            [("app_host", "a"), ("APP_PORT", "1"), ("OTHER_HOST", "b")],
            "App_",
        );
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("HOST"), Some("a"));
        assert_eq!(snapshot.get("PORT"), Some("1"));
    }

    #[test]
    fn empty_prefix_keeps_everything() {
        let snapshot = EnvSnapshot::from_vars([("a", "1"), ("B", "2")], "");
        let keys: Vec<_> = snapshot.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn fallback_does_not_override() {
        let primary = EnvSnapshot::from_vars([("HOST", "process")], "");
        let file = EnvSnapshot::from_vars([("HOST", "file"), ("PORT", "1")], "");
        let merged = primary.with_fallback(file);
        assert_eq!(merged.get("HOST"), Some("process"));
        assert_eq!(merged.get("PORT"), Some("1"));
    }
}
