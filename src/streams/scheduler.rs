//! Deferred-task queue: the "run after the current turn completes"
//! collaborator.
//!
//! Everything runs on one execution context; `run` is the turn boundary.
//! The embedding event loop (or a test) calls `run` whenever it is idle.

use crate::platform::SharedPtr;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

type Task = Box<dyn FnOnce()>;

struct SchedulerInner {
    queue: RefCell<VecDeque<Task>>,
    draining: Cell<bool>,
}

/// Cheap-clone handle to a FIFO deferred-task queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: SharedPtr<SchedulerInner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            inner: SharedPtr::new(SchedulerInner {
                queue: RefCell::new(VecDeque::new()),
                draining: Cell::new(false),
            }),
        }
    }

    /// Enqueue `task` to run after the current turn completes.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.inner.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Drain the queue until empty. Tasks may enqueue further tasks; those
    /// run in the same drain. A nested `run` is a no-op; the outer drain
    /// picks the new work up.
    pub fn run(&self) {
        if self.inner.draining.replace(true) {
            return;
        }
        loop {
            let task = self.inner.queue.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        self.inner.draining.set(false);
    }

    pub fn is_idle(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn runs_in_fifo_order() {
        let sched = Scheduler::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let seen = seen.clone();
            sched.defer(move || seen.borrow_mut().push(i));
        }
        sched.run();
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert!(sched.is_idle());
    }

    #[test]
    fn tasks_scheduled_during_drain_run_in_same_drain() {
        let sched = Scheduler::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            let inner = sched.clone();
            sched.defer(move || {
                seen.borrow_mut().push("outer");
                let seen = seen.clone();
                inner.defer(move || seen.borrow_mut().push("inner"));
            });
        }
        sched.run();
        assert_eq!(*seen.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn nested_run_is_noop() {
        let sched = Scheduler::new();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            let inner = sched.clone();
            sched.defer(move || {
                let hits2 = hits.clone();
                inner.defer(move || hits2.set(hits2.get() + 1));
                inner.run(); // must not re-enter
                assert_eq!(hits.get(), 0);
            });
        }
        sched.run();
        assert_eq!(hits.get(), 1);
    }
}
