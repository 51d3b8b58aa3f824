use super::*;

fn make_accessor(field: &str) -> Behavior {
    let field = field.to_string();
    Arc::new(move |instance, args| {
        if let Some(value) = args.first() {
            instance.fields.insert(field.clone(), value.clone());
            Ok(value.clone())
        } else {
            Ok(instance.fields.get(&field).cloned().unwrap_or(Value::Nil))
        }
    })
}

impl Engine {
    /// Default get/set behavior for a field. One closure per field
    /// name, shared by every type that declares it.
    ///
    /// Contract: zero arguments reads the current value (`Nil` when the
    /// field was never assigned and no default applied); one argument
    /// writes the field and returns the new value, with no other side
    /// effects.
    pub(super) fn accessor_for(&mut self, field: &str) -> Behavior {
        self.accessors
            .entry(field.to_string())
            .or_insert_with(|| make_accessor(field))
            .clone()
    }

    /// Install a type-authored behavior. Overwrites default accessors
    /// and role-installed behaviors of the same name: the type itself
    /// always wins.
    pub fn define_behavior<F>(
        &mut self,
        type_name: &str,
        behavior_name: &str,
        callable: F,
    ) -> Result<(), CompositionError>
    where
        F: Fn(&mut Instance, &[Value]) -> Result<Value, CompositionError> + Send + Sync + 'static,
    {
        let def = self.type_def_mut(type_name)?;
        def.behaviors.insert(
            behavior_name.to_string(),
            BehaviorEntry {
                callable: Arc::new(callable),
                origin: BehaviorOrigin::TypeAuthored,
            },
        );
        self.invalidate_for(type_name);
        Ok(())
    }

    /// Register the type's optional post-construction hook, invoked
    /// once per ancestor in linearized order during construction.
    pub fn set_init_hook<F>(&mut self, type_name: &str, hook: F) -> Result<(), CompositionError>
    where
        F: Fn(&mut Instance, &Args) -> Result<(), CompositionError> + Send + Sync + 'static,
    {
        let def = self.type_def_mut(type_name)?;
        def.init_hook = Some(Arc::new(hook));
        self.invalidate_for(type_name);
        Ok(())
    }

    /// Resolve a behavior through the type and its ancestors,
    /// descendant-first, and invoke it on the instance.
    pub fn invoke(
        &self,
        instance: &mut Instance,
        behavior_name: &str,
        args: &[Value],
    ) -> Result<Value, CompositionError> {
        let type_name = instance.type_name().to_string();
        let callable = self.resolve_behavior(&type_name, behavior_name)?.ok_or(
            CompositionError::UnknownBehavior {
                type_name,
                behavior: behavior_name.to_string(),
            },
        )?;
        callable(instance, args)
    }

    pub(super) fn resolve_behavior(
        &self,
        type_name: &str,
        behavior_name: &str,
    ) -> Result<Option<Behavior>, CompositionError> {
        let order = self.linearize(type_name)?;
        for ancestor in order.iter().rev() {
            if let Some(entry) = self.type_def(ancestor)?.behaviors.get(behavior_name) {
                return Ok(Some(entry.callable.clone()));
            }
        }
        Ok(None)
    }

    /// Whether the type can answer `behavior_name`, through its own
    /// map or any ordinary ancestor.
    pub fn provides_behavior(
        &self,
        type_name: &str,
        behavior_name: &str,
    ) -> Result<bool, CompositionError> {
        Ok(self.resolve_behavior(type_name, behavior_name)?.is_some())
    }
}
