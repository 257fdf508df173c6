//! Migrations and their dependency graph.
//!
//! A [`Migration`] is a named unit of schema change containing a sequence of
//! [`Operation`]s. The [`MigrationGraph`] manages the dependency DAG between
//! migrations across all apps and produces a deterministic topological order.

use std::collections::{BTreeMap, VecDeque};

use serde::Deserialize;

use scriptorium_core::ScriptoriumError;

use crate::operations::Operation;

/// A single migration: identity, dependencies and operations.
///
/// Migrations are identified by `(app_label, name)`. The identity fields are
/// filled in by the loader from the migration file's path, so the files
/// themselves only carry dependencies and operations.
#[derive(Debug, Clone, Deserialize)]
pub struct Migration {
    /// The migration name (e.g. "0003_allow_invite_access_holder").
    #[serde(default)]
    pub name: String,
    /// The application label this migration belongs to.
    #[serde(default)]
    pub app_label: String,
    /// Whether this is the initial migration for the app.
    #[serde(default)]
    pub initial: bool,
    /// Dependencies on other migrations: `(app_label, migration_name)`.
    #[serde(default)]
    pub dependencies: Vec<(String, String)>,
    /// The operations to apply, in order.
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Migration {
    /// Creates an empty migration with the given identity.
    pub fn new(app_label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            app_label: app_label.into(),
            initial: false,
            dependencies: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// Adds a dependency on another migration.
    #[must_use]
    pub fn depends_on(mut self, app_label: impl Into<String>, name: impl Into<String>) -> Self {
        self.dependencies.push((app_label.into(), name.into()));
        self
    }

    /// Adds an operation.
    #[must_use]
    pub fn with_operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Returns the `(app_label, name)` key for this migration.
    pub fn key(&self) -> (String, String) {
        (self.app_label.clone(), self.name.clone())
    }
}

/// A directed acyclic graph of migrations.
///
/// Tracks which migrations exist and their dependency edges, and provides a
/// deterministic topological ordering so migrations can be applied in a
/// correct, reproducible sequence.
#[derive(Debug, Default)]
pub struct MigrationGraph {
    /// Dependencies per node: node -> the nodes it depends on.
    /// A `BTreeMap` keeps iteration (and thus the ordering) deterministic.
    dependencies: BTreeMap<(String, String), Vec<(String, String)>>,
}

impl MigrationGraph {
    /// Creates a new empty migration graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a migration node.
    pub fn add_node(&mut self, app_label: impl Into<String>, name: impl Into<String>) {
        self.dependencies
            .entry((app_label.into(), name.into()))
            .or_default();
    }

    /// Adds a dependency edge: `child` depends on `parent`.
    ///
    /// # Errors
    ///
    /// Returns a database error if either node is missing.
    pub fn add_dependency(
        &mut self,
        child: &(String, String),
        parent: &(String, String),
    ) -> Result<(), ScriptoriumError> {
        if !self.dependencies.contains_key(parent) {
            return Err(ScriptoriumError::DatabaseError(format!(
                "Migration {}.{} depends on unknown migration {}.{}",
                child.0, child.1, parent.0, parent.1
            )));
        }
        let deps = self.dependencies.get_mut(child).ok_or_else(|| {
            ScriptoriumError::DatabaseError(format!(
                "Migration {}.{} not found in graph",
                child.0, child.1
            ))
        })?;
        deps.push(parent.clone());
        Ok(())
    }

    /// Returns `true` if the graph contains the given migration.
    pub fn contains(&self, key: &(String, String)) -> bool {
        self.dependencies.contains_key(key)
    }

    /// Returns the number of migrations in the graph.
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Returns `true` if the graph has no migrations.
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Returns all migrations in topological order (dependencies first).
    ///
    /// Ties are broken by key order, so the result is stable across runs.
    ///
    /// # Errors
    ///
    /// Returns a database error if the graph contains a cycle.
    pub fn topological_order(&self) -> Result<Vec<(String, String)>, ScriptoriumError> {
        let mut in_degree: BTreeMap<&(String, String), usize> = self
            .dependencies
            .keys()
            .map(|key| (key, 0))
            .collect();
        let mut dependents: BTreeMap<&(String, String), Vec<&(String, String)>> = BTreeMap::new();

        for (node, deps) in &self.dependencies {
            for dep in deps {
                *in_degree.get_mut(node).ok_or_else(|| {
                    ScriptoriumError::DatabaseError("Graph node vanished".to_string())
                })? += 1;
                dependents.entry(dep).or_default().push(node);
            }
        }

        let mut queue: VecDeque<&(String, String)> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(key, _)| *key)
            .collect();
        let mut order = Vec::with_capacity(self.dependencies.len());

        while let Some(node) = queue.pop_front() {
            order.push(node.clone());
            if let Some(children) = dependents.get(node) {
                for child in children {
                    let degree = in_degree.get_mut(child).ok_or_else(|| {
                        ScriptoriumError::DatabaseError("Graph node vanished".to_string())
                    })?;
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*child);
                    }
                }
            }
        }

        if order.len() != self.dependencies.len() {
            return Err(ScriptoriumError::DatabaseError(
                "Migration graph contains a cycle".to_string(),
            ));
        }
        Ok(order)
    }
}
