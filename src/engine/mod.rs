use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::CompositionError;
use crate::value::Value;

mod accessors;
mod apply;
mod attributes;
mod construct;
mod inheritance;
mod introspect;
mod roles;

pub use apply::RoleSpec;
pub use attributes::OptionValue;

/// Raw constructor arguments, as handed to `Engine::construct`.
pub type Args = HashMap<String, Value>;

/// A named callable bound to a type, invoked with the instance as
/// implicit first context.
pub type Behavior =
    Arc<dyn Fn(&mut Instance, &[Value]) -> Result<Value, CompositionError> + Send + Sync>;

/// Post-construction initialization hook, run once per ancestor in
/// linearized order with the in-progress instance and the original raw
/// arguments.
pub type InitHook =
    Arc<dyn Fn(&mut Instance, &Args) -> Result<(), CompositionError> + Send + Sync>;

/// Computes an attribute default from the in-progress instance and the
/// raw constructor arguments.
pub type DefaultGenerator = Arc<dyn Fn(&Instance, &Args) -> Value + Send + Sync>;

/// Default for a declared attribute: a literal value or a generator.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Generator(DefaultGenerator),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(v) => write!(f, "Literal({:?})", v),
            DefaultValue::Generator(_) => write!(f, "Generator(..)"),
        }
    }
}

/// Declared field specification. A required attribute with neither a
/// constructor argument nor a default fails construction.
#[derive(Debug, Clone, Default)]
pub struct AttributeSpec {
    pub required: bool,
    pub default: Option<DefaultValue>,
}

/// An opaque record of field name to value, tagged with the type that
/// built it. Fields are mutated through accessor behaviors; absence
/// from the map means the field was never assigned.
#[derive(Debug, Clone)]
pub struct Instance {
    type_name: String,
    pub(crate) fields: HashMap<String, Value>,
}

impl Instance {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            fields: HashMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Current field value, `None` when the field was never assigned.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
enum BehaviorOrigin {
    /// Authored directly on the type; always wins over role installs.
    TypeAuthored,
    /// Default accessor installed by attribute declaration.
    Accessor,
    /// Installed by role application; names the expanded member that
    /// provides the behavior, which for a consumed behavior is the
    /// consumed role rather than its consumer.
    Role(String),
}

#[derive(Clone)]
struct BehaviorEntry {
    callable: Behavior,
    origin: BehaviorOrigin,
}

/// Per-type record of one successfully composed role, with the alias
/// map used for that application (provided name -> installed name).
#[derive(Clone, Debug, Default)]
struct AppliedRole {
    role: String,
    aliases: HashMap<String, String>,
}

#[derive(Clone, Default)]
struct TypeDef {
    parents: Vec<String>,
    /// Own declarations in declaration order; child shadows parent.
    attributes: Vec<(String, AttributeSpec)>,
    behaviors: HashMap<String, BehaviorEntry>,
    applied_roles: Vec<AppliedRole>,
    init_hook: Option<InitHook>,
    /// Whether role-declared attributes may be merged into this type.
    attribute_capable: bool,
}

#[derive(Clone, Default)]
struct RoleDef {
    required: BTreeSet<String>,
    excluded: BTreeSet<String>,
    attributes: Vec<(String, AttributeSpec)>,
    behaviors: HashMap<String, Behavior>,
    /// Roles composed into this role, in consumption order.
    consumed: Vec<String>,
}

/// Derived lookups, computed lazily under a read path and dropped for a
/// type and all of its descendants whenever that type's parent list,
/// attributes, behaviors, or applied roles change.
#[derive(Default)]
struct Caches {
    linearization: RwLock<HashMap<String, Arc<Vec<String>>>>,
    merged_attributes: RwLock<HashMap<String, Arc<Vec<(String, AttributeSpec)>>>>,
    init_order: RwLock<HashMap<String, Arc<Vec<(String, InitHook)>>>>,
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The type-composition engine: process-wide registries for types and
/// roles plus the derived caches over them.
///
/// Registry mutation (declaration, inheritance linking, role
/// application) takes `&mut self`; instantiation and introspection take
/// `&self`, so a populated engine can be shared across threads and
/// instantiated from concurrently.
#[derive(Default)]
pub struct Engine {
    types: HashMap<String, TypeDef>,
    roles: HashMap<String, RoleDef>,
    /// Default accessor behaviors, cached per field name.
    accessors: HashMap<String, Behavior>,
    caches: Caches,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type. Idempotent: re-declaring an existing type keeps
    /// its current definition.
    pub fn declare_type(&mut self, name: &str) {
        self.types.entry(name.to_string()).or_insert_with(|| TypeDef {
            attribute_capable: true,
            ..TypeDef::default()
        });
    }

    /// Register a type that cannot hold declared attributes. Role
    /// attributes applied to it are dropped with a warning instead of
    /// merged.
    pub fn declare_type_without_attributes(&mut self, name: &str) {
        self.types.entry(name.to_string()).or_insert_with(TypeDef::default);
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn type_def(&self, name: &str) -> Result<&TypeDef, CompositionError> {
        self.types
            .get(name)
            .ok_or_else(|| CompositionError::UnknownType {
                type_name: name.to_string(),
            })
    }

    fn type_def_mut(&mut self, name: &str) -> Result<&mut TypeDef, CompositionError> {
        self.types
            .get_mut(name)
            .ok_or_else(|| CompositionError::UnknownType {
                type_name: name.to_string(),
            })
    }

    fn role_def(&self, name: &str) -> Result<&RoleDef, CompositionError> {
        self.roles
            .get(name)
            .ok_or_else(|| CompositionError::RoleLoadFailure {
                role: name.to_string(),
            })
    }

    fn role_def_mut(&mut self, name: &str) -> Result<&mut RoleDef, CompositionError> {
        self.roles
            .get_mut(name)
            .ok_or_else(|| CompositionError::RoleLoadFailure {
                role: name.to_string(),
            })
    }
}
