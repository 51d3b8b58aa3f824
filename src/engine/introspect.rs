use super::*;

impl Engine {
    /// Roles recorded on the type itself, in application order,
    /// including roles pulled in through consumption.
    pub fn applied_roles(&self, type_name: &str) -> Result<Vec<String>, CompositionError> {
        Ok(self
            .type_def(type_name)?
            .applied_roles
            .iter()
            .map(|record| record.role.clone())
            .collect())
    }

    /// Whether the type composes `role`, directly or through any
    /// ordinary ancestor.
    pub fn does(&self, type_name: &str, role: &str) -> Result<bool, CompositionError> {
        for ancestor in self.linearize(type_name)?.iter() {
            if self
                .type_def(ancestor)?
                .applied_roles
                .iter()
                .any(|record| record.role == role)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn instance_does(
        &self,
        instance: &Instance,
        role: &str,
    ) -> Result<bool, CompositionError> {
        self.does(instance.type_name(), role)
    }

    /// The installed name a role's provided behavior ended up under on
    /// a type, accounting for the alias map used at application time.
    pub fn installed_name(
        &self,
        type_name: &str,
        role: &str,
        provided: &str,
    ) -> Result<Option<String>, CompositionError> {
        let def = self.type_def(type_name)?;
        Ok(def
            .applied_roles
            .iter()
            .find(|record| record.role == role)
            .map(|record| {
                record
                    .aliases
                    .get(provided)
                    .cloned()
                    .unwrap_or_else(|| provided.to_string())
            }))
    }

    /// The role providing a behavior installed on the type, if any:
    /// for a consumed behavior this is the consumed role, not its
    /// consumer. `None` for type-authored behaviors and default
    /// accessors.
    pub fn behavior_origin(
        &self,
        type_name: &str,
        behavior_name: &str,
    ) -> Result<Option<String>, CompositionError> {
        let def = self.type_def(type_name)?;
        Ok(match def.behaviors.get(behavior_name).map(|e| &e.origin) {
            Some(BehaviorOrigin::Role(role)) => Some(role.clone()),
            _ => None,
        })
    }
}
