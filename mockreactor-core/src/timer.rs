//! Timer handles and the reactor's active-timer registry.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identity of a timer, unique within one reactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Returned by delayed and periodic registrations.
///
/// Clones share one cancellation flag. Once cancelled a handle stays cancelled.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    id: TimerId,
    cancelled: Rc<Cell<bool>>,
}

impl TimerHandle {
    fn new(id: TimerId) -> Self {
        Self {
            id,
            cancelled: Rc::new(Cell::new(false)),
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.set(true);
    }

    /// Whether both handles refer to the same registration.
    pub fn same_timer(&self, other: &TimerHandle) -> bool {
        Rc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl PartialEq for TimerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_timer(other)
    }
}

impl Eq for TimerHandle {}

/// Hands out monotonically increasing ids, starting at 1.
#[derive(Debug)]
pub struct TimerIdGenerator {
    next: Cell<u64>,
}

impl Default for TimerIdGenerator {
    fn default() -> Self {
        Self { next: Cell::new(1) }
    }
}

impl TimerIdGenerator {
    pub fn next_id(&self) -> TimerId {
        let id = self.next.get();
        self.next.set(id + 1);
        TimerId(id)
    }
}

/// Handles that may still fire. Used for lookup only; the queue owns the work.
#[derive(Debug, Default)]
pub(crate) struct TimerRegistry {
    ids: TimerIdGenerator,
    active: RefCell<Vec<TimerHandle>>,
}

impl TimerRegistry {
    pub(crate) fn create(&self) -> TimerHandle {
        let handle = TimerHandle::new(self.ids.next_id());
        self.active.borrow_mut().push(handle.clone());
        handle
    }

    /// Drops `handle` from the registry. Foreign handles are ignored.
    pub(crate) fn forget(&self, handle: &TimerHandle) -> bool {
        let mut active = self.active.borrow_mut();
        let before = active.len();
        active.retain(|h| !h.same_timer(handle));
        active.len() != before
    }

    pub(crate) fn find(&self, id: TimerId) -> Option<TimerHandle> {
        self.active.borrow().iter().find(|h| h.id == id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.active.borrow().len()
    }

    pub(crate) fn clear(&self) {
        self.active.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_per_registry() {
        let first = TimerRegistry::default();
        let second = TimerRegistry::default();
        assert_eq!(first.create().id().as_u64(), 1);
        assert_eq!(first.create().id().as_u64(), 2);
        assert_eq!(second.create().id().as_u64(), 1);
    }

    #[test]
    fn clones_share_cancellation() {
        let registry = TimerRegistry::default();
        let handle = registry.create();
        let copy = handle.clone();
        handle.cancel();
        assert!(copy.is_cancelled());
        assert_eq!(handle, copy);
    }

    #[test]
    fn forget_ignores_foreign_handles_with_same_id() {
        let ours = TimerRegistry::default();
        let theirs = TimerRegistry::default();
        let mine = ours.create();
        let foreign = theirs.create();
        assert_eq!(mine.id(), foreign.id());

        assert!(!ours.forget(&foreign));
        assert_eq!(ours.len(), 1);
        assert!(ours.forget(&mine));
        assert!(!ours.forget(&mine));
        assert_eq!(ours.len(), 0);
    }

    #[test]
    fn find_by_id() {
        let registry = TimerRegistry::default();
        let _a = registry.create();
        let b = registry.create();
        assert_eq!(registry.find(b.id()), Some(b));
        registry.clear();
        assert!(registry.find(TimerId(1)).is_none());
    }
}
