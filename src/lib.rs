//! Chrysalis - versioned, cycle-tolerant deserialization for long-lived
//! object graphs
//!
//! # Quick Start
//!
//! ```
//! use chrysalis::{
//!     ClassTable, Deserializer, MigrationRegistry, StreamBuilder, Wire,
//! };
//! # use chrysalis::{AttrMap, ClassKey, ObjectRef, Restorable, Result, Value};
//! # use std::{any::Any, cell::RefCell, rc::Rc};
//! # #[derive(Default)]
//! # struct Widget { label: String }
//! # impl Restorable for Widget {
//! #     fn class_key(&self) -> ClassKey { ClassKey::new("ui", "Widget") }
//! #     fn apply_state(&mut self, state: AttrMap) -> Result<()> {
//! #         if let Some(label) = state.get("label").and_then(Value::as_str) {
//! #             self.label = label.to_string();
//! #         }
//! #         Ok(())
//! #     }
//! #     fn as_any(&self) -> &dyn Any { self }
//! #     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! # }
//!
//! // Register the live classes old streams may refer to
//! let mut classes = ClassTable::new();
//! classes.register_class("ui", "Widget", 0, || {
//!     Rc::new(RefCell::new(Widget::default())) as ObjectRef
//! });
//!
//! // The class used to be called ui.Control
//! let mut registry = MigrationRegistry::new();
//! registry.add_rename(ClassKey::new("ui", "Control"), ClassKey::new("ui", "Widget"));
//!
//! // An old stream naming ui.Control restores into a ui.Widget
//! let mut builder = StreamBuilder::new();
//! let control = builder.add_object("ui", "Control");
//! builder.set_attr(control, "label", Wire::Str("ok".into()));
//! let bytes = builder.finish(Wire::Ref(control)).to_bytes()?;
//!
//! let root = Deserializer::new(&mut registry, &classes).deserialize(&bytes)?;
//! assert!(root.as_object().is_some());
//! # Ok::<(), chrysalis::Error>(())
//! ```
//!
//! # Architecture
//!
//! Restoration is two-phase. Phase one resolves every stream-declared class
//! through the rename registry, constructs all instances (so back-references
//! work across cycles), and replays version-migration transforms on each
//! object's raw state. Phase two drives optional per-object initializer
//! coroutines cooperatively until the whole graph is consistent.

// Re-export the public API from chrysalis-engine
pub use chrysalis_engine::*;
