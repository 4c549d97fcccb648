//! Two-phase graph deserialization
//!
//! Phase one walks the object table: resolve each distinct stream class once,
//! construct every instance up front (so back-references work across cycles),
//! migrate each object's raw attribute map, and apply it — via a
//! session-registered [`RestoreStrategy`] when one exists for the class,
//! otherwise through [`Restorable::apply_state`]. Every object that finishes
//! phase one lands on the session's completed-object list.
//!
//! Phase two hands the completed list to the cooperative scheduler, which
//! drives optional per-object initializers to completion.
//!
//! Per-object state machine: `Raw -> ClassResolved -> Migrated -> Initialized`.
//! `ClassNotFound`, `CycleDetected`, and `MigrationIncomplete` abort the whole
//! call during phase one; `UnresolvedDependency` aborts during phase two, by
//! which point every object has reached `Migrated` — so callers can tell
//! "structurally fine but logically deadlocked" from "could not even resolve
//! classes". The session's completed list is discarded when the call returns.

use crate::global::get_global_registry;
use crate::migrate::migrate;
use crate::registry::MigrationRegistry;
use crate::resolver::{resolve, ClassLoader, LiveClass};
use crate::scheduler::run_initializers;
use crate::stream::{StreamDoc, Wire};
use chrysalis_core::error::{Error, Result};
use chrysalis_core::key::ClassKey;
use chrysalis_core::traits::{Restorable, RestoreStrategy};
use chrysalis_core::value::{AttrMap, ObjectRef, Value};
use std::collections::HashMap;
use tracing::{debug, info};

/// A single deserialization session
///
/// Borrows the registry mutably for the duration of the call because class
/// resolution may lazily register rename edges via module-load hooks.
pub struct Deserializer<'a> {
    registry: &'a mut MigrationRegistry,
    loader: &'a dyn ClassLoader,
    strategies: HashMap<ClassKey, Box<dyn RestoreStrategy>>,
}

impl<'a> Deserializer<'a> {
    /// Create a session against an explicit registry and loader
    pub fn new(registry: &'a mut MigrationRegistry, loader: &'a dyn ClassLoader) -> Self {
        Self {
            registry,
            loader,
            strategies: HashMap::new(),
        }
    }

    /// Register a restoration strategy for one live class
    ///
    /// Scoped to this session only: unrelated restorations of the same class
    /// are unaffected. The key is the *live* class identity (post-rename).
    pub fn with_strategy(
        mut self,
        module: &str,
        name: &str,
        strategy: Box<dyn RestoreStrategy>,
    ) -> Self {
        self.strategies.insert(ClassKey::new(module, name), strategy);
        self
    }

    /// Decode `bytes` and restore the object graph, returning the root value
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<Value> {
        let doc = StreamDoc::from_bytes(bytes)?;
        self.restore(&doc)
    }

    /// Restore an already-decoded document
    pub fn restore(&mut self, doc: &StreamDoc) -> Result<Value> {
        // Raw -> ClassResolved: one resolution per distinct stream key
        let mut resolved: HashMap<ClassKey, LiveClass> = HashMap::new();
        for record in &doc.objects {
            let stream_key = ClassKey::new(&record.module, &record.class);
            if !resolved.contains_key(&stream_key) {
                let (live_key, live) = resolve(&stream_key, self.registry, self.loader)?;
                debug!(
                    stream_class = %stream_key,
                    live_class = %live_key,
                    needs_migration = self.registry.needs_migration(&stream_key.module, &stream_key.name),
                    "class resolved"
                );
                resolved.insert(stream_key, live);
            }
        }

        // Construct every instance before applying any state, so that
        // back-references resolve even across object cycles
        let objects: Vec<ObjectRef> = doc
            .objects
            .iter()
            .map(|record| resolved[&ClassKey::new(&record.module, &record.class)].construct())
            .collect();

        // ClassResolved -> Migrated: migrate and apply raw state in stream
        // order, collecting the session's completed-object list
        let mut completed: Vec<ObjectRef> = Vec::with_capacity(objects.len());
        for (index, record) in doc.objects.iter().enumerate() {
            let stream_key = ClassKey::new(&record.module, &record.class);
            let live = &resolved[&stream_key];

            let mut raw_state = AttrMap::with_capacity(record.attrs.len());
            for (name, wire) in &record.attrs {
                raw_state.insert(name.clone(), wire_to_value(wire, &objects)?);
            }

            let state = migrate(raw_state, &stream_key, live, self.registry)?;

            let object = &objects[index];
            match self.strategies.get(live.key()) {
                Some(strategy) => strategy.restore(&mut *object.borrow_mut(), state)?,
                None => object.borrow_mut().apply_state(state)?,
            }
            completed.push(object.clone());
        }

        // Migrated -> Initialized: cooperative phase two over the whole graph
        run_initializers(&completed)?;

        info!(objects = completed.len(), "object graph restored");
        wire_to_value(&doc.root, &objects)
    }
}

/// Resolve a wire value against the constructed object table
fn wire_to_value(wire: &Wire, objects: &[ObjectRef]) -> Result<Value> {
    Ok(match wire {
        Wire::Null => Value::Null,
        Wire::Bool(b) => Value::Bool(*b),
        Wire::Int(i) => Value::Int(*i),
        Wire::Float(f) => Value::Float(*f),
        Wire::Str(s) => Value::Str(s.clone()),
        Wire::Bytes(b) => Value::Bytes(b.clone()),
        Wire::List(items) => Value::List(
            items
                .iter()
                .map(|item| wire_to_value(item, objects))
                .collect::<Result<_>>()?,
        ),
        Wire::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(name, value)| Ok((name.clone(), wire_to_value(value, objects)?)))
                .collect::<Result<_>>()?,
        ),
        Wire::Ref(index) => {
            let object = objects.get(*index as usize).ok_or_else(|| {
                Error::InvalidState(format!("dangling back-reference #{index}"))
            })?;
            Value::Object(object.clone())
        }
    })
}

/// Deserialize against the process-wide default registry
///
/// Convenience wrapper for callers without multi-tenant needs; holds the
/// global registry's write lock for the duration of the call because lazy
/// edge discovery may mutate it.
pub fn deserialize(bytes: &[u8], loader: &dyn ClassLoader) -> Result<Value> {
    let shared = get_global_registry();
    let mut registry = shared.write();
    Deserializer::new(&mut registry, loader).deserialize(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamBuilder;
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Leaf {
        label: String,
    }

    impl Restorable for Leaf {
        fn class_key(&self) -> ClassKey {
            ClassKey::new("m", "Leaf")
        }

        fn apply_state(&mut self, state: AttrMap) -> Result<()> {
            if let Some(label) = state.get("label").and_then(Value::as_str) {
                self.label = label.to_string();
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn leaf_table() -> crate::resolver::ClassTable {
        let mut table = crate::resolver::ClassTable::new();
        table.register_class("m", "Leaf", 0, || {
            Rc::new(RefCell::new(Leaf::default())) as ObjectRef
        });
        table
    }

    #[test]
    fn test_restore_single_object() {
        let mut registry = MigrationRegistry::new();
        let table = leaf_table();

        let mut builder = StreamBuilder::new();
        let leaf = builder.add_object("m", "Leaf");
        builder.set_attr(leaf, "label", Wire::Str("hello".into()));
        let bytes = builder.finish(Wire::Ref(leaf)).to_bytes().unwrap();

        let root = Deserializer::new(&mut registry, &table)
            .deserialize(&bytes)
            .unwrap();
        let object = root.as_object().unwrap().borrow();
        let leaf = object.as_any().downcast_ref::<Leaf>().unwrap();
        assert_eq!(leaf.label, "hello");
    }

    #[test]
    fn test_dangling_root_reference_is_invalid_state() {
        let mut registry = MigrationRegistry::new();
        let table = leaf_table();

        let builder = StreamBuilder::new();
        let bytes = builder.finish(Wire::Ref(9)).to_bytes().unwrap();

        let err = Deserializer::new(&mut registry, &table)
            .deserialize(&bytes)
            .unwrap_err();
        match err {
            Error::InvalidState(msg) => assert!(msg.contains("#9")),
            other => panic!("expected InvalidState, got {other}"),
        }
    }

    #[test]
    fn test_dangling_attr_reference_is_invalid_state() {
        let mut registry = MigrationRegistry::new();
        let table = leaf_table();

        let mut builder = StreamBuilder::new();
        let leaf = builder.add_object("m", "Leaf");
        builder.set_attr(leaf, "peer", Wire::Ref(7));
        let bytes = builder.finish(Wire::Ref(leaf)).to_bytes().unwrap();

        let err = Deserializer::new(&mut registry, &table)
            .deserialize(&bytes)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_non_object_root_passes_through() {
        let mut registry = MigrationRegistry::new();
        let table = leaf_table();

        let builder = StreamBuilder::new();
        let bytes = builder
            .finish(Wire::List(vec![Wire::Int(1), Wire::Str("two".into())]))
            .to_bytes()
            .unwrap();

        let root = Deserializer::new(&mut registry, &table)
            .deserialize(&bytes)
            .unwrap();
        assert_eq!(
            root,
            Value::List(vec![Value::Int(1), Value::Str("two".into())])
        );
    }
}
