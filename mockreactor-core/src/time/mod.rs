//! ## mockreactor-core::time
//! **Virtual clock & wall-clock control**
//!
//! The reactor keeps its own millisecond clock. Every move of that clock is
//! pushed to a [`TimeControl`] so code under test that asks the wall clock for
//! "now" observes the simulated value instead of real time.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::ReactorError;

/// Freeze/travel facility for the process-visible wall clock.
pub trait TimeControl {
    /// Make "now" read as `millis` since the Unix epoch until the next call.
    fn travel_to(&self, millis: u64);

    /// Hand real time back to everyone reading the wall clock.
    fn release(&self);
}

/// Time control that nobody observes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTimeControl;

impl TimeControl for NoopTimeControl {
    fn travel_to(&self, _millis: u64) {}

    fn release(&self) {}
}

/// A shared, freezable wall clock.
///
/// Clones observe the same value, so one copy goes to the reactor and the
/// others to the code under test.
#[derive(Debug, Clone, Default)]
pub struct FrozenWallClock {
    frozen_ms: Arc<AtomicU64>,
    active: Arc<AtomicBool>,
}

impl FrozenWallClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_frozen(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Milliseconds since the Unix epoch: the frozen value while a run is
    /// active, real system time otherwise.
    pub fn now_millis(&self) -> u64 {
        if self.is_frozen() {
            self.frozen_ms.load(Ordering::Acquire)
        } else {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or(0)
        }
    }

    pub fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.now_millis())
    }
}

impl TimeControl for FrozenWallClock {
    fn travel_to(&self, millis: u64) {
        self.frozen_ms.store(millis, Ordering::Release);
        self.active.store(true, Ordering::Release);
    }

    fn release(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Simulated millisecond clock driving the tick loop.
pub struct VirtualClock {
    now_ms: Cell<u64>,
    started_ms: Cell<u64>,
    control: Box<dyn TimeControl>,
}

impl VirtualClock {
    pub fn new(start_millis: u64) -> Self {
        Self::with_control(start_millis, NoopTimeControl)
    }

    pub fn with_control(start_millis: u64, control: impl TimeControl + 'static) -> Self {
        Self {
            now_ms: Cell::new(start_millis),
            started_ms: Cell::new(start_millis),
            control: Box::new(control),
        }
    }

    #[inline]
    pub fn now_millis(&self) -> u64 {
        self.now_ms.get()
    }

    /// Moves the clock to `millis`. Fails if that would move it backwards.
    pub fn advance_to(&self, millis: u64) -> Result<(), ReactorError> {
        let now = self.now_ms.get();
        if millis < now {
            return Err(ReactorError::InvalidAdvance {
                now,
                requested: millis,
            });
        }
        self.set(millis);
        Ok(())
    }

    pub fn advance_by(&self, delta_ms: u64) {
        self.set(self.now_ms.get().saturating_add(delta_ms));
    }

    /// Starts a fresh run at `millis`, ignoring monotonicity.
    pub fn reset(&self, millis: u64) {
        self.started_ms.set(millis);
        self.set(millis);
    }

    /// Releases the time control and returns the virtual milliseconds that
    /// passed since the last reset.
    pub fn release(&self) -> u64 {
        self.control.release();
        self.now_ms.get().saturating_sub(self.started_ms.get())
    }

    fn set(&self, millis: u64) {
        self.now_ms.set(millis);
        self.control.travel_to(millis);
    }
}

/// Whole milliseconds in `duration`, saturating.
pub(crate) fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
