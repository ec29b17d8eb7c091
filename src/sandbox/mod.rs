// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Sandbox collaborator interface
//!
//! The sandbox is an external, bundler-backed runtime that accepts a file
//! set plus a dependency set and reports either a running preview or a
//! structured error. Only the compile-feedback controller writes the
//! component file; resets replace the file set wholesale.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::document::{Dependency, DependencySet};
use crate::error::Result;

/// Path of the generated component inside the sandbox
pub const COMPONENT_FILE: &str = "/App.tsx";

/// The sandbox file set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeMap<String, String>,
}

impl FileSet {
    /// Create an empty file set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a file
    pub fn insert(&mut self, path: impl Into<String>, code: impl Into<String>) {
        self.files.insert(path.into(), code.into());
    }

    /// Read a file
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Replace the whole set. Resets never patch.
    pub fn replace_all(&mut self, files: FileSet) {
        self.files = files.files;
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over (path, code) pairs in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

/// A compile or first-render error reported by the sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileError {
    /// Human-readable error message
    pub message: String,

    /// Optional source position, e.g. `App.tsx:12:8`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_info: Option<String>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line_info: None,
        }
    }
}

/// Result of one compile/evaluate round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CompileOutcome {
    /// The preview is running
    Success,
    /// Compilation or first render failed
    Error { error: CompileError },
}

impl CompileOutcome {
    /// Whether the outcome is a running preview
    pub fn is_success(&self) -> bool {
        matches!(self, CompileOutcome::Success)
    }
}

/// External sandbox runtime
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Compile the file set with the given dependencies
    async fn compile(
        &self,
        files: &FileSet,
        dependencies: &DependencySet,
    ) -> Result<CompileOutcome>;
}

/// The mutable state shared between the controller and the rendering
/// surface: the file set and the merged package set.
#[derive(Debug, Default)]
pub struct SandboxWorkspace {
    pub files: FileSet,
    pub dependencies: DependencySet,
}

impl SandboxWorkspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage generated code and its dependencies for compilation.
    ///
    /// Writes the component file and merges declared packages
    /// (last-write-wins by name).
    pub fn stage(&mut self, code: &str, dependencies: &[Dependency]) {
        self.files.insert(COMPONENT_FILE, code);
        self.dependencies.merge(dependencies);
    }

    /// Full reset: replace the file set and package set
    pub fn reset(&mut self, files: FileSet, dependencies: &[Dependency]) {
        self.files.replace_all(files);
        self.dependencies.replace(dependencies);
    }
}

/// Scripted in-memory sandbox for tests
#[derive(Default)]
pub struct FakeSandbox {
    outcomes: Mutex<Vec<CompileOutcome>>,
    compiled: Mutex<Vec<CompiledSnapshot>>,
}

/// What the fake sandbox saw on one compile call
#[derive(Debug, Clone)]
pub struct CompiledSnapshot {
    pub component_code: Option<String>,
    pub dependency_count: usize,
}

impl FakeSandbox {
    /// Create a sandbox that always succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes; once exhausted, compiles succeed
    pub fn with_outcomes(outcomes: Vec<CompileOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            compiled: Mutex::new(vec![]),
        }
    }

    /// Snapshots of every compile call, in order
    pub fn compiled(&self) -> Vec<CompiledSnapshot> {
        match self.compiled.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Sandbox for FakeSandbox {
    async fn compile(
        &self,
        files: &FileSet,
        dependencies: &DependencySet,
    ) -> Result<CompileOutcome> {
        let snapshot = CompiledSnapshot {
            component_code: files.get(COMPONENT_FILE).map(|c| c.to_string()),
            dependency_count: dependencies.len(),
        };
        match self.compiled.lock() {
            Ok(mut guard) => guard.push(snapshot),
            Err(poisoned) => poisoned.into_inner().push(snapshot),
        }

        let mut outcomes = match self.outcomes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if outcomes.is_empty() {
            Ok(CompileOutcome::Success)
        } else {
            Ok(outcomes.remove(0))
        }
    }
}
