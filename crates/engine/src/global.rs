//! Process-wide default registry
//!
//! Ensures exactly one default [`MigrationRegistry`] exists per process,
//! constructed lazily on first access. The deserializer falls back to this
//! instance when not handed an explicit registry; tests and multi-tenant
//! embeddings should pass their own registry instead and never touch the
//! global.
//!
//! Uses parking_lot::RwLock instead of std::sync::Mutex to avoid cascading
//! panics from mutex poisoning.

use crate::registry::MigrationRegistry;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared, externally-synchronized registry handle
///
/// The registry itself is not internally synchronized; holders take the
/// write lock to populate it (startup merges) and the read or write lock
/// for the duration of a deserialization call.
pub type SharedRegistry = Arc<RwLock<MigrationRegistry>>;

/// Holder slot for the process-wide default registry
///
/// Double-checked locking: the fast path takes only the read lock; the slot
/// is re-checked under the write lock before construction so concurrent
/// first-callers cannot construct twice.
static GLOBAL_REGISTRY: Lazy<RwLock<Option<SharedRegistry>>> = Lazy::new(|| RwLock::new(None));

/// Get the process-wide default registry, constructing it on first call
///
/// Every call returns a handle to the same instance until
/// [`reset_global_registry`] clears the slot.
pub fn get_global_registry() -> SharedRegistry {
    if let Some(registry) = GLOBAL_REGISTRY.read().as_ref() {
        return Arc::clone(registry);
    }
    let mut slot = GLOBAL_REGISTRY.write();
    if let Some(registry) = slot.as_ref() {
        // lost the race; another thread constructed while we waited
        return Arc::clone(registry);
    }
    let fresh: SharedRegistry = Arc::new(RwLock::new(MigrationRegistry::new()));
    *slot = Some(Arc::clone(&fresh));
    fresh
}

/// Clear the process-wide default registry
///
/// Test-only: lets fixtures start from an empty default. Production code
/// must never call this; handles obtained before the reset keep the old
/// instance alive, so resetting mid-flight splits the process across two
/// registries.
pub fn reset_global_registry() {
    *GLOBAL_REGISTRY.write() = None;
}
