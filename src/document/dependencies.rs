// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Extra-library declarations
//!
//! The `EXTRA_LIBRARIES` section lists packages the generated component
//! needs beyond the sandbox defaults:
//!
//! ```text
//! <LIBRARY><NAME>recharts</NAME><VERSION>2.12.0</VERSION></LIBRARY>
//! ```
//!
//! Declarations are merged into the sandbox package set; duplicates by name
//! are last-write-wins.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One package declaration from the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Parse library declarations out of an `EXTRA_LIBRARIES` section body.
///
/// Malformed entries (missing name) are skipped; a missing version defaults
/// to `latest`. Never fails.
pub fn parse_dependencies(content: &str) -> Vec<Dependency> {
    let (Ok(lib_re), Ok(name_re), Ok(version_re)) = (
        Regex::new(r"(?s)<LIBRARY>.*?</LIBRARY>"),
        Regex::new(r"(?s)<NAME>(.*?)</NAME>"),
        Regex::new(r"(?s)<VERSION>(.*?)</VERSION>"),
    ) else {
        return Vec::new();
    };

    lib_re
        .find_iter(content)
        .filter_map(|lib| {
            let lib = lib.as_str();
            let name = name_re.captures(lib)?.get(1)?.as_str().trim().to_string();
            if name.is_empty() {
                return None;
            }
            let version = version_re
                .captures(lib)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "latest".to_string());
            Some(Dependency { name, version })
        })
        .collect()
}

/// The sandbox package set, keyed by package name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    packages: BTreeMap<String, String>,
}

impl DependencySet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge declarations into the set; duplicates by name are
    /// last-write-wins
    pub fn merge(&mut self, dependencies: &[Dependency]) {
        for dep in dependencies {
            self.packages.insert(dep.name.clone(), dep.version.clone());
        }
    }

    /// Version pinned for a package, if present
    pub fn get(&self, name: &str) -> Option<&str> {
        self.packages.get(name).map(String::as_str)
    }

    /// Number of packages in the set
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Iterate over (name, version) pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.packages
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The set as a list of dependencies, in name order
    pub fn to_vec(&self) -> Vec<Dependency> {
        self.packages
            .iter()
            .map(|(n, v)| Dependency::new(n.clone(), v.clone()))
            .collect()
    }

    /// Replace the whole set
    pub fn replace(&mut self, dependencies: &[Dependency]) {
        self.packages.clear();
        self.merge(dependencies);
    }
}
