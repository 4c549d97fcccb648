//! Class resolution: following rename chains to live classes
//!
//! A stream-declared `(module, class)` pair may be several renames behind the
//! current codebase. [`resolve`] walks the registry's rename edges to the
//! live target, detecting cycles with a visited set.
//!
//! Rename chains are discovered incrementally: loading an intermediate class's
//! module may itself register further rename edges. The walk therefore makes
//! two explicit calls per hop, in sequence: [`ClassLoader::prepare`] (run
//! module-load side effects, possibly registering new edges) and then the
//! edge check. Keeping the two concerns separate means cycle detection never
//! depends on loader behavior.

use crate::registry::MigrationRegistry;
use chrysalis_core::error::{Error, Result};
use chrysalis_core::key::ClassKey;
use chrysalis_core::value::ObjectRef;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Factory producing a fresh, default-initialized instance of a live class
pub type ConstructFn = Arc<dyn Fn() -> ObjectRef + Send + Sync>;

/// Side effect run when a class's module is first loaded
///
/// The canonical use is registering rename edges that only the old module
/// knows about ("I used to define `Circle`; it lives in `geometry` now").
pub type ModuleHook = Arc<dyn Fn(&mut MigrationRegistry) + Send + Sync>;

/// Handle to a class as currently defined
#[derive(Clone)]
pub struct LiveClass {
    key: ClassKey,
    version: u64,
    construct: ConstructFn,
}

impl LiveClass {
    /// Describe a live class by identity, declared version, and factory
    pub fn new(key: ClassKey, version: u64, construct: ConstructFn) -> Self {
        Self {
            key,
            version,
            construct,
        }
    }

    /// Identity of the class as currently defined
    pub fn key(&self) -> &ClassKey {
        &self.key
    }

    /// Schema version the class declares
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Construct a fresh instance awaiting state application
    pub fn construct(&self) -> ObjectRef {
        (self.construct)()
    }
}

impl std::fmt::Debug for LiveClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveClass")
            .field("key", &self.key)
            .field("version", &self.version)
            .finish()
    }
}

/// The class-loading mechanism resolution runs against
pub trait ClassLoader {
    /// Run module-load side effects for `key`
    ///
    /// May register rename edges (or anything else) on `registry`. Called
    /// once per hop, before the resolver checks for an outgoing edge.
    fn prepare(&self, key: &ClassKey, registry: &mut MigrationRegistry) -> Result<()>;

    /// Look up the live class for `key`
    ///
    /// Fails with [`Error::ClassNotFound`] when no current definition exists.
    fn load(&self, key: &ClassKey) -> Result<LiveClass>;
}

/// Default [`ClassLoader`]: an explicit table of live classes and hooks
///
/// Applications register every restorable class (and any module-load hooks)
/// up front. Each hook fires at most once per process-level table, mirroring
/// one-shot module initialization.
#[derive(Default)]
pub struct ClassTable {
    classes: HashMap<ClassKey, LiveClass>,
    hooks: HashMap<ClassKey, ModuleHook>,
    fired: Mutex<HashSet<ClassKey>>,
}

impl ClassTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live class under its own key
    pub fn register(&mut self, class: LiveClass) {
        self.classes.insert(class.key().clone(), class);
    }

    /// Convenience: register a class from module, name, version, and factory
    pub fn register_class<F>(&mut self, module: &str, name: &str, version: u64, construct: F)
    where
        F: Fn() -> ObjectRef + Send + Sync + 'static,
    {
        self.register(LiveClass::new(
            ClassKey::new(module, name),
            version,
            Arc::new(construct),
        ));
    }

    /// Attach a module-load hook to a key
    ///
    /// Runs the first time resolution touches `(module, name)`, whether or
    /// not a live class is registered under that key.
    pub fn on_load<F>(&mut self, module: &str, name: &str, hook: F)
    where
        F: Fn(&mut MigrationRegistry) + Send + Sync + 'static,
    {
        self.hooks
            .insert(ClassKey::new(module, name), Arc::new(hook));
    }
}

impl ClassLoader for ClassTable {
    fn prepare(&self, key: &ClassKey, registry: &mut MigrationRegistry) -> Result<()> {
        if let Some(hook) = self.hooks.get(key) {
            if self.fired.lock().insert(key.clone()) {
                debug!(class = %key, "running module-load hook");
                hook(registry);
            }
        }
        Ok(())
    }

    fn load(&self, key: &ClassKey) -> Result<LiveClass> {
        self.classes
            .get(key)
            .cloned()
            .ok_or_else(|| Error::ClassNotFound { key: key.clone() })
    }
}

/// Resolve a stream-declared key to its live class
///
/// Follows zero or more rename edges, running loader side effects before
/// each edge check so lazily-discovered edges take part in the walk. Fails
/// with [`Error::CycleDetected`] if the chain revisits a key, and
/// [`Error::ClassNotFound`] if the terminal key has no live definition.
/// Neither failure mutates the registry beyond what loader hooks already
/// registered, so sibling objects in the same stream resolve unaffected.
pub fn resolve(
    key: &ClassKey,
    registry: &mut MigrationRegistry,
    loader: &dyn ClassLoader,
) -> Result<(ClassKey, LiveClass)> {
    let origin = key.clone();
    let mut visited: HashSet<ClassKey> = HashSet::new();
    let mut current = key.clone();
    loop {
        loader.prepare(&current, registry)?;
        match registry.rename_target(&current).cloned() {
            Some(next) => {
                if !visited.insert(current.clone()) {
                    return Err(Error::CycleDetected {
                        origin,
                        via: current,
                    });
                }
                debug!(from = %current, to = %next, "following rename edge");
                current = next;
            }
            None => {
                let live = loader.load(&current)?;
                return Ok((current, live));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrysalis_core::error::Result;
    use chrysalis_core::value::AttrMap;
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Plain(ClassKey);

    impl chrysalis_core::traits::Restorable for Plain {
        fn class_key(&self) -> ClassKey {
            self.0.clone()
        }

        fn apply_state(&mut self, _state: AttrMap) -> Result<()> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn table_with(entries: &[(&str, &str)]) -> ClassTable {
        let mut table = ClassTable::new();
        for (module, name) in entries {
            let key = ClassKey::new(*module, *name);
            let factory_key = key.clone();
            table.register(LiveClass::new(
                key,
                0,
                Arc::new(move || Rc::new(RefCell::new(Plain(factory_key.clone()))) as ObjectRef),
            ));
        }
        table
    }

    #[test]
    fn test_resolve_without_edges_is_identity() {
        let mut reg = MigrationRegistry::new();
        let table = table_with(&[("m", "A")]);
        let (key, live) = resolve(&ClassKey::new("m", "A"), &mut reg, &table).unwrap();
        assert_eq!(key, ClassKey::new("m", "A"));
        assert_eq!(live.key(), &key);
    }

    #[test]
    fn test_resolve_follows_chain() {
        let mut reg = MigrationRegistry::new();
        reg.add_rename(ClassKey::new("m", "A"), ClassKey::new("m", "B"));
        reg.add_rename(ClassKey::new("m", "B"), ClassKey::new("m", "C"));
        reg.add_rename(ClassKey::new("m", "C"), ClassKey::new("m", "D"));
        let table = table_with(&[("m", "D")]);
        let (key, _) = resolve(&ClassKey::new("m", "A"), &mut reg, &table).unwrap();
        assert_eq!(key, ClassKey::new("m", "D"));
    }

    #[test]
    fn test_resolve_detects_cycle() {
        let mut reg = MigrationRegistry::new();
        reg.add_rename(ClassKey::new("m", "A"), ClassKey::new("m", "B"));
        reg.add_rename(ClassKey::new("m", "B"), ClassKey::new("m", "A"));
        let table = table_with(&[]);
        let err = resolve(&ClassKey::new("m", "A"), &mut reg, &table).unwrap_err();
        match err {
            Error::CycleDetected { origin, .. } => {
                assert_eq!(origin, ClassKey::new("m", "A"));
            }
            other => panic!("expected CycleDetected, got {other}"),
        }
    }

    #[test]
    fn test_resolve_unknown_terminal_fails() {
        let mut reg = MigrationRegistry::new();
        reg.add_rename(ClassKey::new("m", "A"), ClassKey::new("m", "Gone"));
        let table = table_with(&[("m", "A")]);
        let err = resolve(&ClassKey::new("m", "A"), &mut reg, &table).unwrap_err();
        match err {
            Error::ClassNotFound { key } => assert_eq!(key, ClassKey::new("m", "Gone")),
            other => panic!("expected ClassNotFound, got {other}"),
        }
    }

    #[test]
    fn test_hook_registers_edge_lazily() {
        let mut reg = MigrationRegistry::new();
        let mut table = table_with(&[("geometry", "Circle")]);
        // the old module, once "loaded", reveals where the class went
        table.on_load("shapes", "Circle", |registry| {
            registry.add_rename(
                ClassKey::new("shapes", "Circle"),
                ClassKey::new("geometry", "Circle"),
            );
        });
        let (key, _) = resolve(&ClassKey::new("shapes", "Circle"), &mut reg, &table).unwrap();
        assert_eq!(key, ClassKey::new("geometry", "Circle"));
        // the edge the hook registered persists in the registry
        assert!(reg.has_rename("shapes", "Circle"));
    }

    #[test]
    fn test_hook_fires_once() {
        let mut reg = MigrationRegistry::new();
        let mut table = table_with(&[("m", "B")]);
        table.on_load("m", "A", |registry| {
            // appending a transform twice would be observable via list length
            registry.add_transform("m", "B", 1, Arc::new(|_| {}));
            registry.add_rename(ClassKey::new("m", "A"), ClassKey::new("m", "B"));
        });
        resolve(&ClassKey::new("m", "A"), &mut reg, &table).unwrap();
        resolve(&ClassKey::new("m", "A"), &mut reg, &table).unwrap();
        let fns = reg.transforms_for(&ClassKey::new("m", "B"), 1).unwrap();
        assert_eq!(fns.len(), 1);
    }
}
