//! Time-ordered pending task queue.
//!
//! Entries stay sorted by fire time; entries with equal fire times keep their
//! insertion order. Insertion is O(n), which is fine for the handful of timers
//! a test registers.

/// A queued entry and the virtual time it becomes due.
#[derive(Debug)]
pub struct ScheduledTask<T> {
    pub fire_at_millis: u64,
    pub task: T,
}

#[derive(Debug)]
pub struct TaskQueue<T> {
    entries: Vec<ScheduledTask<T>>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts after every entry due at or before `fire_at_millis`.
    pub fn add_task(&mut self, fire_at_millis: u64, task: T) {
        let index = self
            .entries
            .partition_point(|entry| entry.fire_at_millis <= fire_at_millis);
        self.entries.insert(
            index,
            ScheduledTask {
                fire_at_millis,
                task,
            },
        );
    }

    /// Removes and returns every entry due at or before `now_millis`, in order.
    pub fn pop_due(&mut self, now_millis: u64) -> Vec<ScheduledTask<T>> {
        let due = self
            .entries
            .partition_point(|entry| entry.fire_at_millis <= now_millis);
        self.entries.drain(..due).collect()
    }

    pub fn peek_next_fire_time(&self) -> Option<u64> {
        self.entries.first().map(|entry| entry.fire_at_millis)
    }

    /// Shifts every entry so its distance from `from_millis` is kept
    /// relative to `to_millis`. Entries before `from_millis` land on `to_millis`.
    pub fn rebase(&mut self, from_millis: u64, to_millis: u64) {
        for entry in &mut self.entries {
            let offset = entry.fire_at_millis.saturating_sub(from_millis);
            entry.fire_at_millis = to_millis.saturating_add(offset);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
