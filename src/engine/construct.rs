use tracing::debug;

use super::*;

impl Engine {
    /// Build a new instance of `type_name` from raw constructor
    /// arguments.
    ///
    /// Arguments win over declared defaults; generator defaults run
    /// exactly once with the in-progress instance and the raw
    /// arguments. A required attribute still unset afterwards aborts
    /// construction before any initialization hook runs. Argument keys
    /// matching no declared attribute are copied onto the instance
    /// as free-form fields. Finally each ancestor's init hook runs
    /// exactly once, ancestor-first; a hook failure propagates with no
    /// rollback of hooks already run.
    pub fn construct(&self, type_name: &str, args: Args) -> Result<Instance, CompositionError> {
        self.type_def(type_name)?;
        let mut instance = Instance::new(type_name);
        let attributes = self.merged_attributes(type_name)?;

        for (name, spec) in attributes.iter() {
            if let Some(value) = args.get(name) {
                instance.fields.insert(name.clone(), value.clone());
            } else if let Some(default) = &spec.default {
                let value = match default {
                    DefaultValue::Literal(value) => value.clone(),
                    DefaultValue::Generator(generator) => generator(&instance, &args),
                };
                instance.fields.insert(name.clone(), value);
            }
        }

        for (name, spec) in attributes.iter() {
            // An explicit Nil default is a set value; only a field
            // absent from the map is unset.
            if spec.required && !instance.fields.contains_key(name) {
                return Err(CompositionError::MissingRequiredAttribute {
                    type_name: type_name.to_string(),
                    attribute: name.clone(),
                });
            }
        }

        for (key, value) in &args {
            if !attributes.iter().any(|(name, _)| name == key) {
                instance.fields.insert(key.clone(), value.clone());
            }
        }

        for (ancestor, hook) in self.init_order(type_name)?.iter() {
            debug!(type_name, ancestor = %ancestor, "running init hook");
            hook(&mut instance, &args)?;
        }
        Ok(instance)
    }

    /// Ancestor-first list of init hooks for a type, one entry per
    /// ancestor that declares one, in linearized order. Cached.
    fn init_order(
        &self,
        type_name: &str,
    ) -> Result<Arc<Vec<(String, InitHook)>>, CompositionError> {
        if let Some(cached) = read_lock(&self.caches.init_order).get(type_name) {
            return Ok(cached.clone());
        }
        let order = self.linearize(type_name)?;
        let mut hooks = Vec::new();
        for ancestor in order.iter() {
            if let Some(hook) = &self.type_def(ancestor)?.init_hook {
                hooks.push((ancestor.clone(), hook.clone()));
            }
        }
        let hooks = Arc::new(hooks);
        write_lock(&self.caches.init_order).insert(type_name.to_string(), hooks.clone());
        Ok(hooks)
    }
}
