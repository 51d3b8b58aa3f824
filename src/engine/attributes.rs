use super::*;

/// Value side of a raw `(key, value)` attribute option pair, for
/// declaration sites that build specs from loosely structured input.
#[derive(Clone)]
pub enum OptionValue {
    Flag(bool),
    Literal(Value),
    Generator(DefaultGenerator),
}

impl AttributeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required() -> Self {
        Self {
            required: true,
            default: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Literal(value));
        self
    }

    pub fn with_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&Instance, &Args) -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Generator(Arc::new(generator)));
        self
    }

    /// Build a spec from raw option pairs. The only recognized keys are
    /// exactly `required` and `default`; anything else, in particular
    /// near-misses of `required`, is a declaration-time error rather
    /// than a silently ignored key.
    pub fn from_options<'a, I>(attribute: &str, options: I) -> Result<Self, CompositionError>
    where
        I: IntoIterator<Item = (&'a str, OptionValue)>,
    {
        let mut spec = AttributeSpec::default();
        for (key, value) in options {
            match key {
                "required" => {
                    spec.required = match value {
                        OptionValue::Flag(flag) => flag,
                        OptionValue::Literal(v) => v.truthy(),
                        OptionValue::Generator(_) => {
                            return Err(invalid_option(attribute, key));
                        }
                    };
                }
                "default" => {
                    spec.default = Some(match value {
                        OptionValue::Literal(v) => DefaultValue::Literal(v),
                        OptionValue::Generator(g) => DefaultValue::Generator(g),
                        OptionValue::Flag(flag) => DefaultValue::Literal(Value::Bool(flag)),
                    });
                }
                other => return Err(invalid_option(attribute, other)),
            }
        }
        Ok(spec)
    }
}

fn invalid_option(attribute: &str, option: &str) -> CompositionError {
    let hint = if option.to_ascii_lowercase().contains("requir") {
        " (the key must be exactly 'required')".to_string()
    } else {
        String::new()
    };
    CompositionError::InvalidAttributeOption {
        attribute: attribute.to_string(),
        option: option.to_string(),
        hint,
    }
}

impl Engine {
    /// Declare an attribute on a type. The last declaration wins for
    /// the type's own map. A default accessor behavior is installed for
    /// the attribute name unless the type already carries a behavior of
    /// that name, so a type-authored method is never overwritten.
    pub fn declare_attribute(
        &mut self,
        type_name: &str,
        attr_name: &str,
        spec: AttributeSpec,
    ) -> Result<(), CompositionError> {
        self.type_def(type_name)?;
        let accessor = self.accessor_for(attr_name);
        let def = self.type_def_mut(type_name)?;
        if let Some(slot) = def.attributes.iter_mut().find(|(name, _)| name == attr_name) {
            slot.1 = spec;
        } else {
            def.attributes.push((attr_name.to_string(), spec));
        }
        def.behaviors
            .entry(attr_name.to_string())
            .or_insert(BehaviorEntry {
                callable: accessor,
                origin: BehaviorOrigin::Accessor,
            });
        self.invalidate_for(type_name);
        Ok(())
    }

    /// Attributes visible on a type: the full ancestor chain merged
    /// with descendant declarations overriding ancestor declarations of
    /// the same name. Role-declared attributes were folded into each
    /// type's own map at application time, where they never displaced a
    /// type's own declaration. Cached per type.
    pub fn merged_attributes(
        &self,
        type_name: &str,
    ) -> Result<Arc<Vec<(String, AttributeSpec)>>, CompositionError> {
        if let Some(cached) = read_lock(&self.caches.merged_attributes).get(type_name) {
            return Ok(cached.clone());
        }
        let order = self.linearize(type_name)?;
        let mut merged: Vec<(String, AttributeSpec)> = Vec::new();
        for ancestor in order.iter() {
            for (name, spec) in &self.type_def(ancestor)?.attributes {
                if let Some(pos) = merged.iter().position(|(n, _)| n == name) {
                    merged.remove(pos);
                }
                merged.push((name.clone(), spec.clone()));
            }
        }
        let merged = Arc::new(merged);
        write_lock(&self.caches.merged_attributes).insert(type_name.to_string(), merged.clone());
        Ok(merged)
    }
}
