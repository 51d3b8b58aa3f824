use thiserror::Error;

/// Every failure the engine can raise. All variants are synchronous,
/// non-recoverable contract violations surfaced to the immediate caller
/// of the declaration, composition, or construction operation that
/// triggered them; the engine never retries.
///
/// Role-pair fields (`first_role` / `second_role`) are always sorted
/// lexicographically so conflict messages are deterministic regardless
/// of application order.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("type '{type_name}' cannot inherit from itself")]
    RecursiveInheritance { type_name: String },

    #[error("type '{type_name}' specifies unknown parent '{parent}'")]
    ParentLoadFailure { type_name: String, parent: String },

    #[error("invalid option '{option}' declaring attribute '{attribute}'{hint}")]
    InvalidAttributeOption {
        attribute: String,
        option: String,
        hint: String,
    },

    #[error("missing required attribute '{attribute}' constructing '{type_name}'")]
    MissingRequiredAttribute {
        type_name: String,
        attribute: String,
    },

    #[error("cannot resolve role '{role}'")]
    RoleLoadFailure { role: String },

    #[error("role '{first_role}' excludes role '{second_role}' on type '{type_name}'")]
    RoleExclusionViolation {
        type_name: String,
        first_role: String,
        second_role: String,
    },

    #[error(
        "missing required behaviors [{}] applying role '{role}' to type '{type_name}'",
        missing.join(", ")
    )]
    MissingRequiredBehavior {
        type_name: String,
        role: String,
        missing: Vec<String>,
    },

    #[error(
        "behavior '{behavior}' provided by both role '{first_role}' and role '{second_role}' on type '{type_name}'"
    )]
    BehaviorConflict {
        type_name: String,
        behavior: String,
        first_role: String,
        second_role: String,
    },

    #[error(
        "behavior '{provided}' aliased to '{installed}' collides between role '{first_role}' and role '{second_role}' on type '{type_name}'"
    )]
    AliasedBehaviorConflict {
        type_name: String,
        provided: String,
        installed: String,
        first_role: String,
        second_role: String,
    },

    #[error("unknown type '{type_name}'")]
    UnknownType { type_name: String },

    #[error("no behavior '{behavior}' on type '{type_name}' or its ancestors")]
    UnknownBehavior {
        type_name: String,
        behavior: String,
    },

    /// Failure raised from inside a user-supplied behavior or init hook.
    #[error("{0}")]
    Behavior(String),
}

impl CompositionError {
    /// Construct a failure from inside a behavior or init hook body.
    pub fn behavior(message: impl Into<String>) -> Self {
        CompositionError::Behavior(message.into())
    }
}
