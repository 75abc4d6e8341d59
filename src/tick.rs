//! Deferred delivery of synchronously computed results.
//!
//! Every operation in this crate does its work on the caller's turn and hands
//! the outcome to a [`Ticker`], a cooperative single-threaded FIFO queue. A
//! callback therefore never runs inside the call that scheduled it, and
//! callbacks run in the order their operations were issued.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::Result;

/// Completion callback: called exactly once with the outcome of an operation.
pub type Callback<T> = Box<dyn FnOnce(Result<T>)>;

type Task = Box<dyn FnOnce()>;

/// A cooperative event queue. Clones share the same queue.
///
/// Nothing runs until the owner drives the queue with [`Ticker::tick`] or
/// [`Ticker::run_until_idle`]. Tasks scheduled while a task runs go to the
/// back of the queue.
#[derive(Clone, Default)]
pub struct Ticker {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task for a later tick.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Run the operation now and deliver its outcome on a later tick.
    ///
    /// This is the only bridge between the synchronous adapter and the
    /// callback contract; arguments travel inside the `op` closure, so one
    /// function serves every arity.
    pub fn run<T: 'static>(
        &self,
        op: impl FnOnce() -> Result<T>,
        callback: impl FnOnce(Result<T>) + 'static,
    ) {
        let outcome = op();
        self.defer(move || callback(outcome));
    }

    /// Deliver an already known outcome on a later tick.
    pub fn resolve<T: 'static>(&self, outcome: Result<T>, callback: impl FnOnce(Result<T>) + 'static) {
        self.defer(move || callback(outcome));
    }

    /// Run the oldest pending task. Returns `false` if the queue was empty.
    pub fn tick(&self) -> bool {
        // The borrow must end before the task runs, since tasks schedule more tasks.
        let task = self.queue.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks scheduled along
    /// the way. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.tick() {
            ran += 1;
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}
