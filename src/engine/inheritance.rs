use std::collections::HashSet;

use tracing::debug;

use super::*;

impl Engine {
    /// Link `type_name` under one or more parents.
    ///
    /// Each parent must already be declared; a type never extends
    /// itself. Appending is idempotent, and every successful call drops
    /// the derived caches for the type and all of its descendants.
    pub fn add_parent(
        &mut self,
        type_name: &str,
        parents: &[&str],
    ) -> Result<(), CompositionError> {
        self.type_def(type_name)?;
        for parent in parents {
            if *parent == type_name {
                return Err(CompositionError::RecursiveInheritance {
                    type_name: type_name.to_string(),
                });
            }
            if !self.types.contains_key(*parent) {
                return Err(CompositionError::ParentLoadFailure {
                    type_name: type_name.to_string(),
                    parent: parent.to_string(),
                });
            }
        }
        let def = self.type_def_mut(type_name)?;
        for parent in parents {
            if !def.parents.iter().any(|p| p == parent) {
                def.parents.push(parent.to_string());
            }
        }
        self.invalidate_for(type_name);
        Ok(())
    }

    /// Declared direct parents, in declaration order.
    pub fn parents(&self, type_name: &str) -> Result<Vec<String>, CompositionError> {
        Ok(self.type_def(type_name)?.parents.clone())
    }

    /// Ancestor-first linearization of a type's inheritance graph:
    /// depth-first, parents before self, each type exactly once no
    /// matter how many paths reach it. The result is the single source
    /// of truth for initialization order, attribute-merge precedence,
    /// and behavior lookup precedence.
    pub fn linearize(&self, type_name: &str) -> Result<Arc<Vec<String>>, CompositionError> {
        if let Some(cached) = read_lock(&self.caches.linearization).get(type_name) {
            return Ok(cached.clone());
        }
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut in_progress = Vec::new();
        self.linearize_into(type_name, &mut order, &mut visited, &mut in_progress)?;
        let order = Arc::new(order);
        write_lock(&self.caches.linearization).insert(type_name.to_string(), order.clone());
        Ok(order)
    }

    fn linearize_into(
        &self,
        type_name: &str,
        order: &mut Vec<String>,
        visited: &mut HashSet<String>,
        in_progress: &mut Vec<String>,
    ) -> Result<(), CompositionError> {
        if visited.contains(type_name) {
            return Ok(());
        }
        if in_progress.iter().any(|name| name == type_name) {
            // Indirect self-extension: the type reaches itself through
            // its ancestry.
            return Err(CompositionError::RecursiveInheritance {
                type_name: type_name.to_string(),
            });
        }
        in_progress.push(type_name.to_string());
        let parents = self.type_def(type_name)?.parents.clone();
        for parent in &parents {
            self.linearize_into(parent, order, visited, in_progress)?;
        }
        in_progress.pop();
        visited.insert(type_name.to_string());
        order.push(type_name.to_string());
        Ok(())
    }

    /// Every declared type whose ancestry reaches `type_name`.
    fn descendants_of(&self, type_name: &str) -> Vec<String> {
        let mut result = Vec::new();
        for candidate in self.types.keys() {
            if candidate == type_name {
                continue;
            }
            if self.reaches(candidate, type_name) {
                result.push(candidate.clone());
            }
        }
        result
    }

    /// Walk direct parent lists only; usable even while caches are
    /// stale or the graph is mid-mutation.
    fn reaches(&self, from: &str, target: &str) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![from.to_string()];
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(def) = self.types.get(&current) {
                for parent in &def.parents {
                    if parent == target {
                        return true;
                    }
                    pending.push(parent.clone());
                }
            }
        }
        false
    }

    /// Drop every derived cache entry for `type_name` and its
    /// descendants. Called under `&mut self`, so no reader can observe
    /// the registries and the caches out of step.
    pub(super) fn invalidate_for(&mut self, type_name: &str) {
        let mut stale = self.descendants_of(type_name);
        stale.push(type_name.to_string());
        debug!(type_name, invalidated = stale.len(), "cache invalidation");
        let mut linearization = write_lock(&self.caches.linearization);
        let mut merged = write_lock(&self.caches.merged_attributes);
        let mut init_order = write_lock(&self.caches.init_order);
        for name in &stale {
            linearization.remove(name);
            merged.remove(name);
            init_order.remove(name);
        }
    }
}
