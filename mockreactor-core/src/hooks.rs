//! Shutdown hooks, run last-in first-out when the reactor stops.

use std::cell::RefCell;

use crate::reactor::Callback;

#[derive(Default)]
pub struct ShutdownHookRegistry {
    hooks: RefCell<Vec<Callback>>,
}

impl ShutdownHookRegistry {
    pub fn register(&self, hook: Callback) {
        self.hooks.borrow_mut().push(hook);
    }

    /// Empties the registry and returns its hooks in execution order
    /// (reverse of registration).
    pub fn take_for_shutdown(&self) -> Vec<Callback> {
        let mut hooks = self.hooks.take();
        hooks.reverse();
        hooks
    }

    pub fn len(&self) -> usize {
        self.hooks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.borrow().is_empty()
    }
}
