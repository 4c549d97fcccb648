//! Migration registry: rename edges, transform tables, version attributes
//!
//! ## Design Principles
//!
//! 1. **Pure data table**: all mutation is in-memory, no I/O, and every
//!    operation is a total function over maps — missing keys are simply
//!    absent, never errors.
//! 2. **Last write wins** for rename edges and version attributes; transform
//!    lists **append** instead, preserving registration order.
//! 3. **Merge semantics**: registries populated independently (one per
//!    module, plugin, ...) are unioned into the process-wide default at
//!    startup. Merging is idempotent for the overwrite-last-wins maps but
//!    NOT for transforms — merge each registry at most once.
//!
//! The registry is not internally synchronized. Expected usage is "populate
//! via merges at startup, then treat as read-only while deserializing";
//! concurrent mutation needs external locking (see [`crate::global`]).

use chrysalis_core::key::{ClassKey, VersionedClassKey, DEFAULT_VERSION_ATTR};
use chrysalis_core::value::AttrMap;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A registered state-transform function
///
/// Receives the raw attribute map and upgrades it in place to the target
/// version it was registered under. A transform that does not advance the
/// version field itself still makes progress: the migrator bumps the version
/// by exactly one after the step.
pub type TransformFn = Arc<dyn Fn(&mut AttrMap) + Send + Sync>;

/// Registry of class renames and per-version state transforms
#[derive(Default, Clone)]
pub struct MigrationRegistry {
    /// At most one outgoing rename edge per source key
    renames: HashMap<ClassKey, ClassKey>,
    /// Ordered transform lists keyed by (class, target version)
    transforms: HashMap<VersionedClassKey, Vec<TransformFn>>,
    /// Name of the version attribute per class, when not the default
    version_attrs: HashMap<ClassKey, String>,
    /// How many transform entries exist for any version of each class.
    /// Cache for `has_transform`; kept in step by add_transform and merge.
    transform_counts: HashMap<ClassKey, usize>,
}

impl MigrationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Registration ==========

    /// Insert or overwrite the outgoing rename edge for `old`
    pub fn add_rename(&mut self, old: ClassKey, new: ClassKey) {
        self.renames.insert(old, new);
    }

    /// Apply the same module-level rename to many class names at once
    ///
    /// Each class keeps its name; only the module changes. Convenience for
    /// the common "module moved wholesale" case.
    pub fn add_rename_bulk(&mut self, old_module: &str, new_module: &str, names: &[&str]) {
        for name in names {
            self.add_rename(
                ClassKey::new(old_module, *name),
                ClassKey::new(new_module, *name),
            );
        }
    }

    /// Append a transform for `(module, name)` targeting `target_version`
    ///
    /// Multiple transforms for the same versioned key run in registration
    /// order within one version bump.
    pub fn add_transform(
        &mut self,
        module: &str,
        name: &str,
        target_version: u64,
        f: TransformFn,
    ) {
        let key = ClassKey::new(module, name);
        *self.transform_counts.entry(key.clone()).or_insert(0) += 1;
        self.transforms
            .entry(key.at_version(target_version))
            .or_default()
            .push(f);
    }

    /// Set or overwrite the version-attribute name for a class
    pub fn add_version_attribute(&mut self, module: &str, name: &str, attribute: &str) {
        self.version_attrs
            .insert(ClassKey::new(module, name), attribute.to_string());
    }

    /// Union `other`'s tables into `self`
    ///
    /// Rename edges and version attributes overwrite on collision (other
    /// wins); transform lists concatenate, other's functions after self's.
    pub fn merge(&mut self, other: &MigrationRegistry) {
        for (old, new) in &other.renames {
            self.renames.insert(old.clone(), new.clone());
        }
        for (key, attr) in &other.version_attrs {
            self.version_attrs.insert(key.clone(), attr.clone());
        }
        for (key, fns) in &other.transforms {
            self.transforms
                .entry(key.clone())
                .or_default()
                .extend(fns.iter().cloned());
        }
        for (key, count) in &other.transform_counts {
            *self.transform_counts.entry(key.clone()).or_insert(0) += count;
        }
    }

    // ========== Queries ==========

    /// Does `(module, name)` have an outgoing rename edge?
    pub fn has_rename(&self, module: &str, name: &str) -> bool {
        self.renames.contains_key(&ClassKey::new(module, name))
    }

    /// Target of the rename edge out of `key`, if any
    pub fn rename_target(&self, key: &ClassKey) -> Option<&ClassKey> {
        self.renames.get(key)
    }

    /// Does any version of `(module, name)` have at least one transform?
    pub fn has_transform(&self, module: &str, name: &str) -> bool {
        self.transform_counts
            .get(&ClassKey::new(module, name))
            .copied()
            .unwrap_or(0)
            > 0
    }

    /// Ordered transform list for `key` at `target_version`, if registered
    pub fn transforms_for(&self, key: &ClassKey, target_version: u64) -> Option<&[TransformFn]> {
        self.transforms
            .get(&key.at_version(target_version))
            .map(Vec::as_slice)
    }

    /// Version-attribute name for a class, falling back to the default
    pub fn version_attribute_for(&self, module: &str, name: &str) -> &str {
        self.version_attribute_for_key(&ClassKey::new(module, name))
    }

    /// Version-attribute name for a class key, falling back to the default
    pub fn version_attribute_for_key(&self, key: &ClassKey) -> &str {
        self.version_attrs
            .get(key)
            .map(String::as_str)
            .unwrap_or(DEFAULT_VERSION_ATTR)
    }

    /// Does this class ever need migration, directly or via its rename chain?
    ///
    /// Cheap fast-path query: walks the rename chain consulting only the
    /// per-class transform counters. A chain that loops back on itself
    /// answers `true` so the caller takes the slow path, where resolution
    /// reports the cycle properly.
    pub fn needs_migration(&self, module: &str, name: &str) -> bool {
        let mut current = ClassKey::new(module, name);
        let mut visited: HashSet<ClassKey> = HashSet::new();
        loop {
            if self.has_transform(&current.module, &current.name) {
                return true;
            }
            match self.renames.get(&current) {
                Some(next) => {
                    if !visited.insert(current) {
                        return true;
                    }
                    current = next.clone();
                }
                None => return false,
            }
        }
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("renames", &self.renames.len())
            .field("transform_entries", &self.transforms.len())
            .field("version_attrs", &self.version_attrs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrysalis_core::value::Value;

    fn key(module: &str, name: &str) -> ClassKey {
        ClassKey::new(module, name)
    }

    #[test]
    fn test_add_rename_last_write_wins() {
        let mut reg = MigrationRegistry::new();
        reg.add_rename(key("m", "A"), key("m", "B"));
        reg.add_rename(key("m", "A"), key("m", "C"));
        assert_eq!(reg.rename_target(&key("m", "A")), Some(&key("m", "C")));
    }

    #[test]
    fn test_add_rename_bulk_preserves_names() {
        let mut reg = MigrationRegistry::new();
        reg.add_rename_bulk("old_mod", "new_mod", &["A", "B", "C"]);
        for name in ["A", "B", "C"] {
            assert_eq!(
                reg.rename_target(&key("old_mod", name)),
                Some(&key("new_mod", name))
            );
        }
        assert!(!reg.has_rename("old_mod", "D"));
    }

    #[test]
    fn test_transforms_append_in_order() {
        let mut reg = MigrationRegistry::new();
        reg.add_transform(
            "m",
            "A",
            1,
            Arc::new(|state| {
                state.insert("first".into(), Value::Bool(true));
            }),
        );
        reg.add_transform(
            "m",
            "A",
            1,
            Arc::new(|state| {
                // runs second: overwrites what the first transform wrote
                state.insert("first".into(), Value::Bool(false));
            }),
        );
        let fns = reg.transforms_for(&key("m", "A"), 1).unwrap();
        assert_eq!(fns.len(), 2);
        let mut state = AttrMap::new();
        for f in fns {
            f(&mut state);
        }
        assert_eq!(state.get("first"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_has_transform_any_version() {
        let mut reg = MigrationRegistry::new();
        assert!(!reg.has_transform("m", "A"));
        reg.add_transform("m", "A", 7, Arc::new(|_| {}));
        assert!(reg.has_transform("m", "A"));
        assert!(!reg.has_transform("m", "B"));
    }

    #[test]
    fn test_version_attribute_default_and_override() {
        let mut reg = MigrationRegistry::new();
        assert_eq!(reg.version_attribute_for("m", "A"), DEFAULT_VERSION_ATTR);
        reg.add_version_attribute("m", "A", "rev");
        assert_eq!(reg.version_attribute_for("m", "A"), "rev");
    }

    #[test]
    fn test_merge_unions_all_tables() {
        let mut a = MigrationRegistry::new();
        a.add_rename(key("m", "Old"), key("m", "Mid"));
        a.add_version_attribute("m", "X", "rev_a");
        a.add_transform("m", "X", 1, Arc::new(|_| {}));

        let mut b = MigrationRegistry::new();
        b.add_rename(key("m", "Mid"), key("m", "New"));
        b.add_version_attribute("m", "X", "rev_b");
        b.add_transform("m", "X", 1, Arc::new(|_| {}));
        b.add_transform("m", "Y", 2, Arc::new(|_| {}));

        a.merge(&b);

        assert_eq!(a.rename_target(&key("m", "Old")), Some(&key("m", "Mid")));
        assert_eq!(a.rename_target(&key("m", "Mid")), Some(&key("m", "New")));
        // b wins the version-attribute collision
        assert_eq!(a.version_attribute_for("m", "X"), "rev_b");
        // transform lists concatenate: a's entry then b's
        assert_eq!(a.transforms_for(&key("m", "X"), 1).unwrap().len(), 2);
        assert!(a.has_transform("m", "Y"));
    }

    #[test]
    fn test_needs_migration_through_rename_chain() {
        let mut reg = MigrationRegistry::new();
        reg.add_rename(key("m", "A"), key("m", "B"));
        reg.add_rename(key("m", "B"), key("m", "C"));
        assert!(!reg.needs_migration("m", "A"));
        reg.add_transform("m", "C", 1, Arc::new(|_| {}));
        assert!(reg.needs_migration("m", "A"));
        assert!(reg.needs_migration("m", "B"));
        assert!(!reg.needs_migration("m", "Unrelated"));
    }

    #[test]
    fn test_needs_migration_terminates_on_cycle() {
        let mut reg = MigrationRegistry::new();
        reg.add_rename(key("m", "A"), key("m", "B"));
        reg.add_rename(key("m", "B"), key("m", "A"));
        // must not loop forever; answers true so resolution reports the cycle
        assert!(reg.needs_migration("m", "A"));
    }
}
