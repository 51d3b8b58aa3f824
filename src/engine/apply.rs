use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::*;

/// One role in an application batch: a role name plus an optional
/// alias map renaming provided behaviors to different installed names.
#[derive(Clone, Debug)]
pub struct RoleSpec {
    role: String,
    aliases: HashMap<String, String>,
}

impl RoleSpec {
    pub fn named(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            aliases: HashMap::new(),
        }
    }

    /// Rename one provided behavior for this application.
    pub fn with_alias(mut self, provided: impl Into<String>, installed: impl Into<String>) -> Self {
        self.aliases.insert(provided.into(), installed.into());
        self
    }
}

impl From<&str> for RoleSpec {
    fn from(role: &str) -> Self {
        RoleSpec::named(role)
    }
}

fn sorted_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

enum Conflict {
    Plain {
        behavior: String,
        roles: (String, String),
    },
    Aliased {
        provided: String,
        installed: String,
        roles: (String, String),
    },
}

struct PlannedInstall {
    role: String,
    provided: String,
    installed: String,
    aliased: bool,
    callable: Behavior,
    skip: bool,
}

impl Engine {
    /// Compose one or more roles into a type.
    ///
    /// The batch walks the full application state machine: load each
    /// role, check exclusions (in both directions, including between
    /// batch members), merge role attributes when the type can hold
    /// them, validate required behaviors transitively, detect behavior
    /// conflicts before installing anything, install what survives,
    /// and record the applied roles for `does` queries. Applying the
    /// roles one at a time reaches the same outcome, except that
    /// requirements and conflicts are then judged against each smaller
    /// batch.
    pub fn apply_roles(
        &mut self,
        type_name: &str,
        specs: &[RoleSpec],
    ) -> Result<(), CompositionError> {
        self.type_def(type_name)?;
        for spec in specs {
            self.role_def(&spec.role)?;
        }

        // Re-applying an already-applied role is a no-op, as is naming
        // the same role twice in one batch.
        let mut batch: Vec<RoleSpec> = Vec::new();
        {
            let applied = &self.type_def(type_name)?.applied_roles;
            for spec in specs {
                if applied.iter().any(|record| record.role == spec.role) {
                    warn!(role = %spec.role, type_name, "role already applied, skipping");
                    continue;
                }
                if batch.iter().any(|s| s.role == spec.role) {
                    warn!(role = %spec.role, type_name, "role repeated in batch, skipping");
                    continue;
                }
                batch.push(spec.clone());
            }
        }
        if batch.is_empty() {
            return Ok(());
        }

        self.check_exclusions(type_name, &batch)?;
        self.merge_role_attributes(type_name, &batch)?;
        self.check_requirements(type_name, &batch)?;
        let planned = self.detect_conflicts(type_name, &batch)?;

        // Install and record; from here on nothing can fail.
        for install in planned {
            if install.skip {
                continue;
            }
            let def = self.type_def_mut(type_name)?;
            def.behaviors.insert(
                install.installed,
                BehaviorEntry {
                    callable: install.callable,
                    origin: BehaviorOrigin::Role(install.role),
                },
            );
        }
        for spec in &batch {
            let expanded = self.expanded_roles(&spec.role)?;
            let def = self.type_def_mut(type_name)?;
            def.applied_roles.push(AppliedRole {
                role: spec.role.clone(),
                aliases: spec.aliases.clone(),
            });
            for member in expanded.iter().skip(1) {
                if !def.applied_roles.iter().any(|record| &record.role == member) {
                    debug!(role = %member, via = %spec.role, type_name, "recording consumed role");
                    def.applied_roles.push(AppliedRole {
                        role: member.clone(),
                        aliases: HashMap::new(),
                    });
                }
            }
        }
        self.invalidate_for(type_name);
        Ok(())
    }

    /// Compose a single role outside the declaration phase. Same path
    /// and same outcome as a one-element batch.
    pub fn apply_role_now(&mut self, type_name: &str, role: &str) -> Result<(), CompositionError> {
        self.apply_roles(type_name, &[RoleSpec::named(role)])
    }

    fn check_exclusions(
        &self,
        type_name: &str,
        batch: &[RoleSpec],
    ) -> Result<(), CompositionError> {
        let applied: Vec<String> = self
            .type_def(type_name)?
            .applied_roles
            .iter()
            .map(|record| record.role.clone())
            .collect();
        let mut expansions = Vec::new();
        let mut exclusions = Vec::new();
        for spec in batch {
            expansions.push(self.expanded_roles(&spec.role)?);
            exclusions.push(self.resolved_exclusions(&spec.role)?);
        }
        for (spec, excluded) in batch.iter().zip(&exclusions) {
            for name in excluded {
                if applied.iter().any(|a| a == name) {
                    let (first_role, second_role) = sorted_pair(&spec.role, name);
                    return Err(CompositionError::RoleExclusionViolation {
                        type_name: type_name.to_string(),
                        first_role,
                        second_role,
                    });
                }
            }
        }
        // Reverse direction: a role already composed may exclude an
        // incoming one.
        for prior in &applied {
            let excluded = self.resolved_exclusions(prior)?;
            for (spec, expanded) in batch.iter().zip(&expansions) {
                if expanded.iter().any(|member| excluded.contains(member)) {
                    let (first_role, second_role) = sorted_pair(prior, &spec.role);
                    return Err(CompositionError::RoleExclusionViolation {
                        type_name: type_name.to_string(),
                        first_role,
                        second_role,
                    });
                }
            }
        }
        // Between batch members, both directions.
        for i in 0..batch.len() {
            for j in 0..batch.len() {
                if i == j {
                    continue;
                }
                if expansions[j]
                    .iter()
                    .any(|member| exclusions[i].contains(member))
                {
                    let (first_role, second_role) = sorted_pair(&batch[i].role, &batch[j].role);
                    return Err(CompositionError::RoleExclusionViolation {
                        type_name: type_name.to_string(),
                        first_role,
                        second_role,
                    });
                }
            }
        }
        Ok(())
    }

    fn merge_role_attributes(
        &mut self,
        type_name: &str,
        batch: &[RoleSpec],
    ) -> Result<(), CompositionError> {
        let capable = self.type_def(type_name)?.attribute_capable;
        for spec in batch {
            let attributes = self.resolved_role_attributes(&spec.role)?;
            if attributes.is_empty() {
                continue;
            }
            if !capable {
                warn!(
                    role = %spec.role,
                    type_name,
                    dropped = attributes.len(),
                    "type cannot hold attributes, dropping role attributes"
                );
                continue;
            }
            for (name, attr_spec) in attributes {
                // Role attributes never displace the type's own
                // declarations.
                let own = self
                    .type_def(type_name)?
                    .attributes
                    .iter()
                    .any(|(n, _)| n == &name);
                if own {
                    continue;
                }
                self.declare_attribute(type_name, &name, attr_spec)?;
            }
        }
        Ok(())
    }

    fn check_requirements(
        &self,
        type_name: &str,
        batch: &[RoleSpec],
    ) -> Result<(), CompositionError> {
        let mut batch_installs: HashSet<String> = HashSet::new();
        for spec in batch {
            for (provided, _, _) in self.resolved_behaviors(&spec.role)? {
                let installed = spec.aliases.get(&provided).cloned().unwrap_or(provided);
                batch_installs.insert(installed);
            }
        }
        for spec in batch {
            let mut missing = Vec::new();
            for name in self.resolved_requirements(&spec.role)? {
                if batch_installs.contains(&name) {
                    continue;
                }
                if self.provides_behavior(type_name, &name)? {
                    continue;
                }
                missing.push(name);
            }
            if !missing.is_empty() {
                return Err(CompositionError::MissingRequiredBehavior {
                    type_name: type_name.to_string(),
                    role: spec.role.clone(),
                    missing,
                });
            }
        }
        Ok(())
    }

    /// Plan every install for the batch and scan for conflicts before
    /// anything lands on the type. An alias-mediated clash wins the
    /// report over a plain one when both occur; role pairs are sorted
    /// for deterministic messages.
    fn detect_conflicts(
        &self,
        type_name: &str,
        batch: &[RoleSpec],
    ) -> Result<Vec<PlannedInstall>, CompositionError> {
        let def = self.type_def(type_name)?;
        let mut planned: Vec<PlannedInstall> = Vec::new();
        let mut conflicts: Vec<Conflict> = Vec::new();

        for spec in batch {
            let expanded = self.expanded_roles(&spec.role)?;
            for (provided, callable, source) in self.resolved_behaviors(&spec.role)? {
                let installed = spec
                    .aliases
                    .get(&provided)
                    .cloned()
                    .unwrap_or_else(|| provided.clone());
                let aliased = installed != provided;
                let mut skip = false;

                if let Some(existing) = def.behaviors.get(&installed) {
                    match &existing.origin {
                        // The type's own behavior wins silently.
                        BehaviorOrigin::TypeAuthored | BehaviorOrigin::Accessor => skip = true,
                        // The same providing member again (two consumers
                        // sharing one consumed role), or a member of this
                        // expansion: redefinition, not a conflict.
                        BehaviorOrigin::Role(other)
                            if *other == source || expanded.iter().any(|m| m == other) => {}
                        BehaviorOrigin::Role(other) => {
                            let existing_alias = def
                                .applied_roles
                                .iter()
                                .find(|record| &record.role == other)
                                .and_then(|record| {
                                    record
                                        .aliases
                                        .iter()
                                        .find(|(from, to)| *to == &installed && from != to)
                                })
                                .map(|(from, _)| from.clone());
                            conflicts.push(make_conflict(
                                &provided,
                                &installed,
                                aliased,
                                existing_alias,
                                &source,
                                other,
                            ));
                        }
                    }
                }

                if !skip {
                    if let Some(prior) = planned
                        .iter()
                        .find(|p| p.installed == installed && !p.skip)
                    {
                        if prior.role != source {
                            let existing_alias = if prior.aliased {
                                Some(prior.provided.clone())
                            } else {
                                None
                            };
                            conflicts.push(make_conflict(
                                &provided,
                                &installed,
                                aliased,
                                existing_alias,
                                &source,
                                &prior.role,
                            ));
                        }
                    }
                }

                planned.push(PlannedInstall {
                    role: source,
                    provided,
                    installed,
                    aliased,
                    callable,
                    skip,
                });
            }
        }

        let chosen = conflicts
            .iter()
            .find(|c| matches!(c, Conflict::Aliased { .. }))
            .or_else(|| conflicts.first());
        match chosen {
            Some(Conflict::Aliased {
                provided,
                installed,
                roles,
            }) => Err(CompositionError::AliasedBehaviorConflict {
                type_name: type_name.to_string(),
                provided: provided.clone(),
                installed: installed.clone(),
                first_role: roles.0.clone(),
                second_role: roles.1.clone(),
            }),
            Some(Conflict::Plain { behavior, roles }) => Err(CompositionError::BehaviorConflict {
                type_name: type_name.to_string(),
                behavior: behavior.clone(),
                first_role: roles.0.clone(),
                second_role: roles.1.clone(),
            }),
            None => Ok(planned),
        }
    }
}

fn make_conflict(
    provided: &str,
    installed: &str,
    aliased: bool,
    existing_alias: Option<String>,
    current_role: &str,
    other_role: &str,
) -> Conflict {
    let roles = sorted_pair(current_role, other_role);
    if aliased {
        Conflict::Aliased {
            provided: provided.to_string(),
            installed: installed.to_string(),
            roles,
        }
    } else if let Some(existing_provided) = existing_alias {
        Conflict::Aliased {
            provided: existing_provided,
            installed: installed.to_string(),
            roles,
        }
    } else {
        Conflict::Plain {
            behavior: installed.to_string(),
            roles,
        }
    }
}
