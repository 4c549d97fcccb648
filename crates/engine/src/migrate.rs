//! State migration: version-by-version transform pipeline
//!
//! Given the raw attribute map restored from the stream and the resolved
//! live class, [`migrate`] replays every applicable transform step, hopping
//! across rename edges between version runs, until the state carries the
//! identity and version the live class declares.
//!
//! ## Stepping rules
//!
//! - A missing version attribute reads as version 0.
//! - All functions registered for one target version run in registration
//!   order within a single step.
//! - A step whose functions raised the version field adopts the new value;
//!   otherwise the engine bumps the version by exactly one and writes the
//!   field back, guaranteeing forward progress.
//! - Version bumps are strictly increasing; a transform cannot move the
//!   version backwards.
//! - A rename hop preserves the version: a rename is a same-version
//!   re-skinning, not itself a version bump.

use crate::registry::MigrationRegistry;
use crate::resolver::LiveClass;
use chrysalis_core::error::{Error, Result};
use chrysalis_core::key::ClassKey;
use chrysalis_core::value::{AttrMap, Value};
use std::collections::HashSet;
use tracing::debug;

/// Read a non-negative version number out of an attribute map
fn read_version(state: &AttrMap, attribute: &str) -> u64 {
    match state.get(attribute) {
        Some(Value::Int(v)) if *v > 0 => *v as u64,
        _ => 0,
    }
}

/// Migrate raw state from its recorded identity to the live class
///
/// Walks transform steps and rename hops starting from `original` until no
/// more apply, then checks the post-condition: the reached identity must be
/// `live`'s key and the reached version must be `live`'s declared version.
/// A mismatch means the registry's chain does not actually terminate at the
/// requested class — a registration bug, reported as
/// [`Error::MigrationIncomplete`].
///
/// Purely functional over the registry: only reads, never writes, so a
/// failed migration cannot corrupt sibling objects' migrations.
pub fn migrate(
    mut raw_state: AttrMap,
    original: &ClassKey,
    live: &LiveClass,
    registry: &MigrationRegistry,
) -> Result<AttrMap> {
    let mut current = original.clone();
    let mut version = read_version(&raw_state, registry.version_attribute_for_key(&current));
    let target_version = live.version();

    // resolve() already walked this chain, so a cycle here means migrate was
    // called directly against a broken registry; fail rather than spin
    let mut hopped: HashSet<ClassKey> = HashSet::new();

    loop {
        while let Some(fns) = registry.transforms_for(&current, version + 1) {
            let attribute = registry.version_attribute_for_key(&current).to_string();
            let before = version;
            for f in fns {
                f(&mut raw_state);
            }
            let after = read_version(&raw_state, &attribute);
            if after > before {
                version = after;
            } else {
                version = before + 1;
                raw_state.insert(attribute.clone(), Value::Int(version as i64));
            }
            debug!(class = %current, from = before, to = version, "applied transform step");
        }
        match registry.rename_target(&current) {
            Some(next) => {
                if !hopped.insert(current.clone()) {
                    return Err(Error::CycleDetected {
                        origin: original.clone(),
                        via: current,
                    });
                }
                debug!(from = %current, to = %next, version, "rename hop");
                current = next.clone();
            }
            None => break,
        }
    }

    if &current != live.key() || version != target_version {
        return Err(Error::MigrationIncomplete {
            expected: live.key().clone(),
            expected_version: target_version,
            actual: current,
            actual_version: version,
        });
    }
    Ok(raw_state)
}
