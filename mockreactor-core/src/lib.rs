//! # mockreactor-core
//!
//! A deterministic, virtual-clock reactor for testing event-loop driven code
//! without real time passing and without real concurrency.
//!
//! ### Key Submodules:
//! - `reactor`: the tick loop and the public event-loop operations
//! - `queue`: time-ordered pending task queue
//! - `timer`: cancellable timer handles and id generation
//! - `fault`: fault isolation and the single error handler
//! - `hooks`: LIFO shutdown hooks
//! - `time`: `VirtualClock` and wall-clock control
//!
//! ```
//! use std::time::Duration;
//! use mockreactor_core::prelude::*;
//!
//! let reactor = Reactor::new();
//! reactor
//!     .run(|r| {
//!         r.add_timer(Duration::from_secs(30), |r| {
//!             r.stop();
//!             Ok(())
//!         });
//!         Ok(())
//!     })
//!     .unwrap();
//! assert_eq!(reactor.now_millis(), 30_000);
//! ```

pub mod error;
pub mod event_loop;
pub mod fault;
pub mod hooks;
pub mod queue;
pub mod reactor;
pub mod time;
pub mod timer;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::event_loop::EventLoop;
    pub use crate::reactor::{Callback, CallbackResult, PeriodicCallback, Reactor};
    pub use crate::time::{FrozenWallClock, NoopTimeControl, TimeControl, VirtualClock};
    pub use crate::timer::{TimerHandle, TimerId};
}

pub use error::{CallbackFault, FaultSource, ReactorError};
pub use reactor::Reactor;
