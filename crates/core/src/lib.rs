//! Core types and traits for Chrysalis
//!
//! This crate defines the foundational types used throughout the system:
//! - ClassKey / VersionedClassKey: class identity as recorded in a stream
//! - Value: unified attribute value enum (including sibling-object references)
//! - Error: error type hierarchy
//! - Traits: core trait definitions (Restorable, Initializer, RestoreStrategy)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod key;
pub mod traits;
pub mod value;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use key::{ClassKey, VersionedClassKey, DEFAULT_VERSION_ATTR};
pub use traits::{Initializer, Restorable, RestoreStrategy, Step};
pub use value::{AttrMap, ObjectRef, Value};
