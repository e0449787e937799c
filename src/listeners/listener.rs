//! # Owner-context listener trait
//!
//! Listeners are invoked synchronously by the scheduler while it processes a
//! submission or a completion, i.e. on the context that owns the scheduler.
//! They are not required to be `Send`, so they may hold `Rc<RefCell<_>>`
//! handles to state that belongs to the interactive context.
//!
//! ## Delivery rules
//! - Each callback fires at most once per task per listener.
//! - A task cancelled while pending only sees `on_queued` then `on_cancelled`.
//! - A per-submission listener is called before the global ones.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::TaskError;
use crate::tasks::{Outcome, TaskMeta};

/// Callbacks for task lifecycle transitions. Every method defaults to a no-op.
pub trait Listener<O> {
    /// Task accepted into its lane.
    fn on_queued(&mut self, _meta: &TaskMeta) {}

    /// Task promoted to the running slot.
    fn on_started(&mut self, _meta: &TaskMeta) {}

    /// Task returned a value.
    fn on_completed(&mut self, _meta: &TaskMeta, _output: &O) {}

    /// Task failed; `error` is the payload returned by the task, untouched.
    fn on_error(&mut self, _meta: &TaskMeta, _error: &TaskError) {}

    /// Task reached `Cancelled` (removed while pending or stopped after a cancel request).
    fn on_cancelled(&mut self, _meta: &TaskMeta) {}

    /// Dispatches a terminal outcome to the matching callback.
    fn on_outcome(&mut self, meta: &TaskMeta, outcome: &Outcome<O>) {
        match outcome {
            Outcome::Finished(output) => self.on_completed(meta, output),
            Outcome::Failed(error) => self.on_error(meta, error),
            Outcome::Cancelled => self.on_cancelled(meta),
        }
    }
}

/// Shared listeners: the owning context keeps one clone to read the state.
impl<O, L: Listener<O>> Listener<O> for Rc<RefCell<L>> {
    fn on_queued(&mut self, meta: &TaskMeta) {
        self.borrow_mut().on_queued(meta);
    }

    fn on_started(&mut self, meta: &TaskMeta) {
        self.borrow_mut().on_started(meta);
    }

    fn on_completed(&mut self, meta: &TaskMeta, output: &O) {
        self.borrow_mut().on_completed(meta, output);
    }

    fn on_error(&mut self, meta: &TaskMeta, error: &TaskError) {
        self.borrow_mut().on_error(meta, error);
    }

    fn on_cancelled(&mut self, meta: &TaskMeta) {
        self.borrow_mut().on_cancelled(meta);
    }
}
