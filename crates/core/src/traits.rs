//! Core trait definitions
//!
//! Three seams connect the engine to application code:
//!
//! - [`Restorable`]: behavior every live (restorable) class implements —
//!   identity, declared schema version, and how migrated raw state becomes
//!   live attributes.
//! - [`Initializer`] / [`Step`]: cooperative post-restore setup. An
//!   initializer is an explicit state machine stepped round-robin by the
//!   scheduler; `Step::Pending` means "a sibling I depend on is not ready
//!   yet, try me again next round".
//! - [`RestoreStrategy`]: a per-class restoration hook owned by a single
//!   deserialization session. Registered on the session, never installed on
//!   the class itself, so one stream's special handling cannot leak into
//!   unrelated restorations of the same class.

use crate::error::Result;
use crate::key::ClassKey;
use crate::value::{AttrMap, ObjectRef};
use std::any::Any;

/// Outcome of one initializer resumption step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The initializer is waiting on a sibling and wants another round
    Pending,
    /// The initializer has finished; do not step it again
    Done,
}

/// Cooperative post-restore initializer
///
/// Stepped once per scheduler round. Implementations must make progress by
/// observing sibling state between rounds; an initializer that unconditionally
/// returns `Pending` will trip the scheduler's round cap.
pub trait Initializer {
    /// Resume the initializer for one step
    fn step(&mut self) -> Result<Step>;
}

/// A live class participating in versioned restoration
///
/// `Any` is a supertrait so initializers and callers can downcast sibling
/// handles to their concrete types via [`Restorable::as_any`].
pub trait Restorable: Any {
    /// Identity of the class as currently defined
    fn class_key(&self) -> ClassKey;

    /// Schema version the current class definition expects
    ///
    /// Migration terminates when raw state reaches exactly this version.
    /// Unversioned classes stay at the default of 0.
    fn class_version(&self) -> u64 {
        0
    }

    /// Apply fully-migrated state as a direct attribute update
    fn apply_state(&mut self, state: AttrMap) -> Result<()>;

    /// Optional post-restore initializer
    ///
    /// Called once per object after the whole stream reached migrated state.
    /// `this` is the object's own shared handle; implementations clone it (and
    /// any sibling handles captured during `apply_state`) into the returned
    /// state machine. Returning `None` opts out of phase two.
    fn initializer(&self, this: &ObjectRef) -> Option<Box<dyn Initializer>> {
        let _ = this;
        None
    }

    /// Upcast for concrete-type downcasting
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for concrete-type downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Session-scoped restoration hook for one class
///
/// When a strategy is registered for a class key, the deserializer hands it
/// the migrated state instead of calling [`Restorable::apply_state`]. The
/// strategy owns the whole restoration of that object.
pub trait RestoreStrategy {
    /// Restore `target` from fully-migrated `state`
    fn restore(&self, target: &mut dyn Restorable, state: AttrMap) -> Result<()>;
}
