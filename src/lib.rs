//! Minimal runtime type-composition engine.
//!
//! Programs register record types ("classes") with declared attributes,
//! link them into an inheritance graph, compose reusable behavior
//! bundles ("roles") into them with conflict detection, aliasing and
//! exclusion rules, and then instantiate them through a uniform
//! constructor that chains per-ancestor initialization hooks.
//!
//! The registries are populated under `&mut Engine` during a load
//! phase; construction and introspection take `&Engine`, so a populated
//! engine can be shared across threads and instantiated from
//! concurrently.
//!
//! ```
//! use classkit::{Args, AttributeSpec, Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine.declare_type("Point");
//! engine.declare_attribute("Point", "x", AttributeSpec::required()).unwrap();
//! engine.declare_attribute("Point", "y", AttributeSpec::new().with_default(Value::Int(0))).unwrap();
//!
//! let point = engine
//!     .construct("Point", Args::from([("x".to_string(), Value::Int(3))]))
//!     .unwrap();
//! assert_eq!(point.get("x"), Some(&Value::Int(3)));
//! assert_eq!(point.get("y"), Some(&Value::Int(0)));
//! ```

mod engine;
mod error;
mod value;

pub use engine::{
    Args, AttributeSpec, Behavior, DefaultGenerator, DefaultValue, Engine, InitHook, Instance,
    OptionValue, RoleSpec,
};
pub use error::CompositionError;
pub use value::Value;
