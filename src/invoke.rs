//! Calling user scripts and latching their single outcome.
//!
//! User code is untrusted: it may call `done` several times, call it after
//! throwing, call it from another task, or never call it. [`Done`] is a
//! settle-once slot; the first settlement wins and the rest are dropped.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::script::{ExtensionFn, ScriptError};

/// Reported when every `done` handle is dropped without being called.
pub const NO_COMPLETION: &str = "Extensibility point completed without invoking its callback";

const PANICKED: &str = "Extensibility point panicked";

/// What a single script invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// `done` was called without an error or a result
    NoResult,
    /// `done` was called with a result
    Success(Value),
    /// The script threw or passed an error to `done`
    Failed(ScriptError),
}

#[derive(Debug)]
struct SettleSlot {
    settled: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl SettleSlot {
    fn settle(&self, outcome: Outcome) -> bool {
        if self.settled.swap(true, Ordering::AcqRel) {
            tracing::debug!("ignoring repeated completion of extensibility point");
            return false;
        }

        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(sender) = sender {
            // Receiver gone means the run was abandoned; nothing to report to.
            let _ = sender.send(outcome);
        }
        true
    }
}

/// Completion callback handed to user scripts as their third argument.
///
/// Cheap to clone and `Send`, so scripts may move it into spawned tasks and
/// complete on a later scheduler turn. Only the first completion across all
/// clones counts; each method returns whether its call was the one honored.
#[derive(Debug, Clone)]
pub struct Done {
    slot: Arc<SettleSlot>,
}

impl Done {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let done = Self {
            slot: Arc::new(SettleSlot {
                settled: AtomicBool::new(false),
                sender: Mutex::new(Some(tx)),
            }),
        };
        (done, rx)
    }

    /// The general `done(error, result)` form.
    ///
    /// An error wins over a result. `(None, None)` completes with no result.
    pub fn call(&self, error: Option<ScriptError>, result: Option<Value>) -> bool {
        let outcome = match (error, result) {
            (Some(err), _) => Outcome::Failed(err),
            (None, Some(value)) => Outcome::Success(value),
            (None, None) => Outcome::NoResult,
        };
        self.slot.settle(outcome)
    }

    /// `done()`: complete with no result.
    pub fn ok(&self) -> bool {
        self.call(None, None)
    }

    /// `done(null, result)`.
    pub fn success(&self, result: Value) -> bool {
        self.call(None, Some(result))
    }

    /// `done(error)`.
    pub fn fail(&self, error: ScriptError) -> bool {
        self.call(Some(error), None)
    }

    /// Whether the invocation has already been completed.
    pub fn is_settled(&self) -> bool {
        self.slot.settled.load(Ordering::Acquire)
    }
}

/// Runs `func` once with `(user, context, done)` and waits for its outcome.
///
/// A returned `Err` or a panic counts as a synchronous throw and settles the
/// run unless `done` got there first. The future stays pending while any
/// unsettled `done` handle is alive; there is no internal timeout.
///
/// A caught panic is reported as an `error` event, but the process panic hook
/// still runs first. Hosts that want panics only in their `tracing` output
/// should install their own hook with [`std::panic::set_hook`].
///
/// # Examples
///
/// ```
/// use extension_core::{invoke, Done, Outcome, ScriptError};
/// use serde_json::{json, Value};
///
/// # tokio_test_block(async {
/// let script = |_: Value, _: Value, done: Done| -> Result<(), ScriptError> {
///     done.ok();
///     Ok(())
/// };
/// assert_eq!(invoke(&script, json!({}), json!({})).await, Outcome::NoResult);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
/// # }
/// ```
pub async fn invoke(func: &dyn ExtensionFn, user: Value, context: Value) -> Outcome {
    let (done, rx) = Done::channel();

    let returned = panic::catch_unwind(AssertUnwindSafe(|| func.call(user, context, done.clone())));
    match returned {
        Ok(Ok(())) => {}
        Ok(Err(thrown)) => {
            done.fail(thrown);
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(panic = %message, "extensibility point panicked");
            done.fail(ScriptError::internal(message));
        }
    }
    drop(done);

    rx.await
        .unwrap_or_else(|_| Outcome::Failed(ScriptError::internal(NO_COMPLETION)))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        PANICKED.to_owned()
    }
}
