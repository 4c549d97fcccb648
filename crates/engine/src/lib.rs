//! Chrysalis engine: versioned, cycle-tolerant object-graph restoration
//!
//! Long-lived serialized object graphs must survive source evolution:
//! classes get renamed, moved between modules, or given new attribute
//! layouts, yet old data must still deserialize into correctly-initialized
//! instances of the *current* definitions. This crate layers those semantics
//! on top of a plain object-serialization stream:
//!
//! - [`MigrationRegistry`]: class-rename edges, per-version transform
//!   functions, and version-attribute names, with merge semantics.
//! - [`get_global_registry`]: lazily-constructed process-wide default.
//! - [`resolve`]: rename-chain walk from a stream-declared class to the live
//!   one, with cycle detection and lazy edge discovery.
//! - [`migrate`]: version-by-version transform pipeline ending at the live
//!   class's declared version.
//! - [`Deserializer`]: the two-phase session — migrate every object, then
//!   drive cooperative initializer coroutines round-robin to completion.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod deserializer;
pub mod global;
pub mod migrate;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod stream;

pub use deserializer::{deserialize, Deserializer};
pub use global::{get_global_registry, reset_global_registry, SharedRegistry};
pub use migrate::migrate;
pub use registry::{MigrationRegistry, TransformFn};
pub use resolver::{resolve, ClassLoader, ClassTable, ConstructFn, LiveClass, ModuleHook};
pub use scheduler::run_initializers;
pub use stream::{ObjectRecord, StreamBuilder, StreamDoc, Wire, STREAM_FORMAT_VERSION};

// Re-export the core vocabulary so engine users need only one import
pub use chrysalis_core::{
    AttrMap, ClassKey, Error, Initializer, ObjectRef, Restorable, RestoreStrategy, Result, Step,
    Value, VersionedClassKey, DEFAULT_VERSION_ATTR,
};
