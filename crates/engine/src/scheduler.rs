//! Phase-two cooperative initializer scheduler
//!
//! After every object in a stream has reached migrated state, objects that
//! expose an initializer get it driven here. Strictly single-threaded and
//! cooperative: one resumption step per coroutine per round, round-robin, in
//! stream registration order. An initializer that yields `Pending` is retried
//! next round.
//!
//! Deadlock detection: with N started initializers, at most N full rounds are
//! allowed. Any chain of initializers that only ever waits on *completed*
//! siblings finishes within that bound (each round completes at least one);
//! exceeding it means some set of initializers waits on each other's final
//! values and can never converge, reported as
//! [`chrysalis_core::Error::UnresolvedDependency`] listing every stuck
//! object.

use chrysalis_core::error::{Error, Result};
use chrysalis_core::traits::{Initializer, Step};
use chrysalis_core::value::ObjectRef;
use tracing::{debug, warn};

struct PendingInit {
    /// Position in the session's completed-object list, for diagnostics
    index: usize,
    object: ObjectRef,
    init: Box<dyn Initializer>,
}

/// Drive all initializers among `completed` to completion
///
/// `completed` is the session's completed-object list in stream order.
/// Objects without an initializer are skipped. Returns once every started
/// coroutine finished, or fails with `UnresolvedDependency` when the round
/// cap is exceeded.
pub fn run_initializers(completed: &[ObjectRef]) -> Result<()> {
    let mut pending: Vec<PendingInit> = Vec::new();
    for (index, object) in completed.iter().enumerate() {
        let init = object.borrow().initializer(object);
        if let Some(init) = init {
            pending.push(PendingInit {
                index,
                object: object.clone(),
                init,
            });
        }
    }
    if pending.is_empty() {
        return Ok(());
    }

    let max_rounds = pending.len();
    for round in 1..=max_rounds {
        debug!(round, pending = pending.len(), "initializer round");
        let mut still_pending = Vec::new();
        for mut entry in pending {
            match entry.init.step()? {
                Step::Done => {
                    debug!(object = %entry.object.borrow().class_key(), index = entry.index, "initializer finished");
                }
                Step::Pending => still_pending.push(entry),
            }
        }
        pending = still_pending;
        if pending.is_empty() {
            return Ok(());
        }
        if round == max_rounds - 1 {
            warn!(
                pending = pending.len(),
                "entering final initializer round with coroutines still pending"
            );
        }
    }

    let stuck = pending
        .iter()
        .map(|entry| format!("{}#{}", entry.object.borrow().class_key(), entry.index))
        .collect();
    Err(Error::UnresolvedDependency {
        rounds: max_rounds,
        stuck,
    })
}
