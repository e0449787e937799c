//! # Closure-backed listener.
//!
//! ```rust
//! use worklane::Callbacks;
//!
//! let cb = Callbacks::<u32>::new()
//!     .on_completed(|meta, bpm| println!("{}: {bpm} bpm", meta.key))
//!     .on_error(|meta, err| eprintln!("{}: {}", meta.key, err.as_message()));
//! # drop(cb);
//! ```

use crate::error::TaskError;
use crate::listeners::Listener;
use crate::tasks::TaskMeta;

type MetaFn = Box<dyn FnMut(&TaskMeta)>;
type OutputFn<O> = Box<dyn FnMut(&TaskMeta, &O)>;
type ErrorFn = Box<dyn FnMut(&TaskMeta, &TaskError)>;

/// [`Listener`] assembled from optional closures.
pub struct Callbacks<O> {
    queued: Option<MetaFn>,
    started: Option<MetaFn>,
    completed: Option<OutputFn<O>>,
    error: Option<ErrorFn>,
    cancelled: Option<MetaFn>,
}

impl<O> Default for Callbacks<O> {
    fn default() -> Self {
        Self {
            queued: None,
            started: None,
            completed: None,
            error: None,
            cancelled: None,
        }
    }
}

impl<O> Callbacks<O> {
    /// Creates an empty set of callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_queued(mut self, f: impl FnMut(&TaskMeta) + 'static) -> Self {
        self.queued = Some(Box::new(f));
        self
    }

    pub fn on_started(mut self, f: impl FnMut(&TaskMeta) + 'static) -> Self {
        self.started = Some(Box::new(f));
        self
    }

    pub fn on_completed(mut self, f: impl FnMut(&TaskMeta, &O) + 'static) -> Self {
        self.completed = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&TaskMeta, &TaskError) + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn on_cancelled(mut self, f: impl FnMut(&TaskMeta) + 'static) -> Self {
        self.cancelled = Some(Box::new(f));
        self
    }
}

impl<O> Listener<O> for Callbacks<O> {
    fn on_queued(&mut self, meta: &TaskMeta) {
        if let Some(f) = self.queued.as_mut() {
            f(meta);
        }
    }

    fn on_started(&mut self, meta: &TaskMeta) {
        if let Some(f) = self.started.as_mut() {
            f(meta);
        }
    }

    fn on_completed(&mut self, meta: &TaskMeta, output: &O) {
        if let Some(f) = self.completed.as_mut() {
            f(meta, output);
        }
    }

    fn on_error(&mut self, meta: &TaskMeta, error: &TaskError) {
        if let Some(f) = self.error.as_mut() {
            f(meta, error);
        }
    }

    fn on_cancelled(&mut self, meta: &TaskMeta) {
        if let Some(f) = self.cancelled.as_mut() {
            f(meta);
        }
    }
}
