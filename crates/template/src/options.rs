//! Compile options.

use serde::Deserialize;
use std::collections::BTreeMap;

const DEFAULT_KNOWN_HELPERS: &[&str] = &[
    "helperMissing",
    "blockHelperMissing",
    "each",
    "if",
    "unless",
    "with",
    "log",
    "lookup",
];

/// Options for a single compilation.
///
/// Loadable from TOML or JSON; every field is optional:
///
/// ```toml
/// known_helpers_only = true
/// bind_markers = true
///
/// [known_helpers]
/// testing = true
/// with = false
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompileOptions {
    /// Overrides merged over the default known-helpers table. `false`
    /// removes a default entry.
    pub known_helpers: BTreeMap<String, bool>,
    /// Treat ids missing from the table as plain context lookups.
    pub known_helpers_only: bool,
    /// Wrap content insertions in comment markers and record binding sites.
    pub bind_markers: bool,
}

impl CompileOptions {
    pub fn with_known_helper(mut self, name: impl Into<String>) -> Self {
        self.known_helpers.insert(name.into(), true);
        self
    }

    pub fn known_helpers_only(mut self, enabled: bool) -> Self {
        self.known_helpers_only = enabled;
        self
    }

    pub fn bind_markers(mut self, enabled: bool) -> Self {
        self.bind_markers = enabled;
        self
    }

    /// Effective table: defaults merged with overrides.
    pub fn known_helpers(&self) -> KnownHelpers {
        let mut table: BTreeMap<String, bool> = DEFAULT_KNOWN_HELPERS
            .iter()
            .map(|name| (name.to_string(), true))
            .collect();
        table.extend(self.known_helpers.iter().map(|(k, v)| (k.clone(), *v)));
        KnownHelpers { table }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnownHelpers {
    table: BTreeMap<String, bool>,
}

impl KnownHelpers {
    pub fn contains(&self, name: &str) -> bool {
        self.table.get(name).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_known() {
        let known = CompileOptions::default().known_helpers();
        for name in DEFAULT_KNOWN_HELPERS {
            assert!(known.contains(name), "{name}");
        }
        assert!(!known.contains("title"));
    }

    #[test]
    fn overrides_add_and_remove() {
        let mut options = CompileOptions::default().with_known_helper("testing");
        options.known_helpers.insert("with".to_string(), false);
        let known = options.known_helpers();
        assert!(known.contains("testing"));
        assert!(!known.contains("with"));
        assert!(known.contains("if"));
    }

    #[test]
    fn loads_from_toml() {
        let options: CompileOptions = toml::from_str(
            "known_helpers_only = true\n[known_helpers]\ntesting = true\n",
        )
        .expect("valid options");
        assert!(options.known_helpers_only);
        assert!(!options.bind_markers);
        assert!(options.known_helpers().contains("testing"));
    }
}
