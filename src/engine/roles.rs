use std::collections::HashSet;

use super::*;

impl Engine {
    /// Register a role. Roles live in their own namespace: they are
    /// blueprints consumed by types or by other roles, never
    /// instantiated. Idempotent.
    pub fn declare_role(&mut self, name: &str) {
        self.roles.entry(name.to_string()).or_default();
    }

    pub fn is_role(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Append behavior names the role demands from any type composing
    /// it. Validation is deferred to role application.
    pub fn require_behaviors(
        &mut self,
        role: &str,
        behavior_names: &[&str],
    ) -> Result<(), CompositionError> {
        let def = self.role_def_mut(role)?;
        for name in behavior_names {
            def.required.insert(name.to_string());
        }
        Ok(())
    }

    /// Append roles this role refuses to share a type with. Composing
    /// an excluded role onto a type that already composes this one, or
    /// vice versa, is fatal at application time.
    pub fn exclude_roles(
        &mut self,
        role: &str,
        excluded: &[&str],
    ) -> Result<(), CompositionError> {
        let def = self.role_def_mut(role)?;
        for name in excluded {
            def.excluded.insert(name.to_string());
        }
        Ok(())
    }

    /// Declare an attribute the role carries into consuming types.
    /// Last declaration wins, as for type attributes.
    pub fn declare_role_attribute(
        &mut self,
        role: &str,
        attr_name: &str,
        spec: AttributeSpec,
    ) -> Result<(), CompositionError> {
        let def = self.role_def_mut(role)?;
        if let Some(slot) = def.attributes.iter_mut().find(|(name, _)| name == attr_name) {
            slot.1 = spec;
        } else {
            def.attributes.push((attr_name.to_string(), spec));
        }
        Ok(())
    }

    /// Register a behavior the role provides to consuming types.
    pub fn provide_behavior<F>(
        &mut self,
        role: &str,
        behavior_name: &str,
        callable: F,
    ) -> Result<(), CompositionError>
    where
        F: Fn(&mut Instance, &[Value]) -> Result<Value, CompositionError> + Send + Sync + 'static,
    {
        let def = self.role_def_mut(role)?;
        def.behaviors
            .insert(behavior_name.to_string(), Arc::new(callable));
        Ok(())
    }

    /// Role-to-role composition. The consuming role inherits the
    /// consumed roles' requirements (and, transitively, their provided
    /// behaviors and attributes), but nothing is installed and no
    /// requirement is enforced until a concrete type applies the
    /// consumer.
    pub fn consume(&mut self, role: &str, consumed: &[&str]) -> Result<(), CompositionError> {
        self.role_def(role)?;
        for other in consumed {
            self.role_def(other)?;
        }
        let def = self.role_def_mut(role)?;
        for other in consumed {
            if !def.consumed.iter().any(|c| c == other) {
                def.consumed.push(other.to_string());
            }
        }
        Ok(())
    }

    /// The role followed by everything it consumes, transitively,
    /// depth-first in consumption order, each role once.
    pub(super) fn expanded_roles(&self, role: &str) -> Result<Vec<String>, CompositionError> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.expand_roles_into(role, &mut out, &mut seen)?;
        Ok(out)
    }

    fn expand_roles_into(
        &self,
        role: &str,
        out: &mut Vec<String>,
        seen: &mut HashSet<String>,
    ) -> Result<(), CompositionError> {
        if !seen.insert(role.to_string()) {
            return Ok(());
        }
        out.push(role.to_string());
        let consumed = self.role_def(role)?.consumed.clone();
        for other in &consumed {
            self.expand_roles_into(other, out, seen)?;
        }
        Ok(())
    }

    /// Union of the role's own required behaviors and those of every
    /// consumed role.
    pub(super) fn resolved_requirements(
        &self,
        role: &str,
    ) -> Result<BTreeSet<String>, CompositionError> {
        let mut required = BTreeSet::new();
        for member in self.expanded_roles(role)? {
            required.extend(self.role_def(&member)?.required.iter().cloned());
        }
        Ok(required)
    }

    /// Union of exclusions across the role and everything it consumes.
    pub(super) fn resolved_exclusions(
        &self,
        role: &str,
    ) -> Result<BTreeSet<String>, CompositionError> {
        let mut excluded = BTreeSet::new();
        for member in self.expanded_roles(role)? {
            excluded.extend(self.role_def(&member)?.excluded.iter().cloned());
        }
        Ok(excluded)
    }

    /// Behaviors the role brings to an application: consumed roles'
    /// provisions merged first, the consumer's own shadowing any
    /// consumed behavior of the same name. Each entry carries the
    /// expanded member that actually provides it, so two roles sharing
    /// a consumed role install its behaviors under the same provenance.
    pub(super) fn resolved_behaviors(
        &self,
        role: &str,
    ) -> Result<Vec<(String, Behavior, String)>, CompositionError> {
        let mut merged: Vec<(String, Behavior, String)> = Vec::new();
        for member in self.expanded_roles(role)?.iter().rev() {
            for (name, callable) in &self.role_def(member)?.behaviors {
                if let Some(pos) = merged.iter().position(|(n, _, _)| n == name) {
                    merged.remove(pos);
                }
                merged.push((name.clone(), callable.clone(), member.clone()));
            }
        }
        merged.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(merged)
    }

    /// Attributes the role brings to an application, consumer's own
    /// winning over consumed roles'.
    pub(super) fn resolved_role_attributes(
        &self,
        role: &str,
    ) -> Result<Vec<(String, AttributeSpec)>, CompositionError> {
        let mut merged: Vec<(String, AttributeSpec)> = Vec::new();
        for member in self.expanded_roles(role)?.iter().rev() {
            for (name, spec) in &self.role_def(member)?.attributes {
                if let Some(pos) = merged.iter().position(|(n, _)| n == name) {
                    merged.remove(pos);
                }
                merged.push((name.clone(), spec.clone()));
            }
        }
        Ok(merged)
    }
}
