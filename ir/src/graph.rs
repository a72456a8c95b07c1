//! Dependency graph traversal.
//!
//! Dependencies form a DAG keyed by function name: code emission guards every definition with a
//! name-derived include guard, so two functions sharing a name on one path would shadow each other.

use std::collections::{HashMap, HashSet};

use crate::error::*;
use crate::function::Function;

/// Fails with [`Error::DependencyCycle`] if any transitive dependency is named `name`.
pub(crate) fn check_acyclic(name: &str, dependencies: &[Function]) -> Result<()> {
    let mut path = vec![name.to_string()];
    let mut cleared = HashSet::new();
    for dependency in dependencies {
        if find_name(dependency, name, &mut path, &mut cleared) {
            return DependencyCycleSnafu { path }.fail();
        }
    }
    Ok(())
}

fn find_name(function: &Function, target: &str, path: &mut Vec<String>, cleared: &mut HashSet<u64>) -> bool {
    path.push(function.name().to_string());
    if function.name() == target {
        return true;
    }
    if !cleared.contains(&function.content_hash()) {
        for dependency in function.dependencies() {
            if find_name(dependency, target, path, cleared) {
                return true;
            }
        }
        cleared.insert(function.content_hash());
    }
    path.pop();
    false
}

impl Function {
    /// Every function reachable through dependencies, dependencies before dependents,
    /// in declaration order, each structurally distinct function once. `self` comes last.
    pub fn dependency_order(&self) -> Vec<Function> {
        let mut order = Vec::new();
        let mut emitted = HashSet::new();
        let mut names: HashMap<String, u64> = HashMap::new();
        visit(self, &mut order, &mut emitted, &mut names);
        order
    }
}

fn visit(function: &Function, order: &mut Vec<Function>, emitted: &mut HashSet<Function>, names: &mut HashMap<String, u64>) {
    if emitted.contains(function) {
        return;
    }
    for dependency in function.dependencies() {
        visit(dependency, order, emitted, names);
    }

    let hash = function.content_hash();
    if let Some(previous) = names.insert(function.name().to_string(), hash)
        && previous != hash
    {
        tracing::warn!(function = %function.name(), "two different definitions share one name; the inclusion guard keeps the first");
    }

    emitted.insert(function.clone());
    order.push(function.clone());
}
