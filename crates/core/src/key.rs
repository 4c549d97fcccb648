//! Class identity types
//!
//! A [`ClassKey`] names a class the way a serialized stream recorded it,
//! independent of whether that class still exists in the current codebase.
//! A [`VersionedClassKey`] additionally carries the schema version the keyed
//! class wants to become (the *target* version of a transform step).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute name used for a class's schema version when none was registered.
pub const DEFAULT_VERSION_ATTR: &str = "schema_version";

/// Identity of a class as recorded in a serialized stream
///
/// Two keys are equal iff both module and class name match. Rename edges in
/// the migration registry map one `ClassKey` to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassKey {
    /// Module (or namespace) the class was defined in
    pub module: String,
    /// Unqualified class name
    pub name: String,
}

impl ClassKey {
    /// Create a new class key
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Attach a target version, producing the key transform tables use
    pub fn at_version(&self, version: u64) -> VersionedClassKey {
        VersionedClassKey {
            key: self.clone(),
            version,
        }
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// A class key plus the schema version it wants to become
///
/// Transform functions are registered against the *target* version: an entry
/// at version N upgrades raw state from N-1 to N.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionedClassKey {
    /// The class being upgraded
    pub key: ClassKey,
    /// Target schema version of the transform step
    pub version: u64,
}

impl fmt::Display for VersionedClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.key, self.version)
    }
}
