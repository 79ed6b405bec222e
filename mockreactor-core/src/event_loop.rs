//! The event-loop surface production code is written against.
//!
//! Code that only needs to schedule work takes `&impl EventLoop`, so tests can
//! hand it a [`Reactor`] while the application wires in its real runtime.

use std::time::Duration;

use crate::error::{CallbackFault, ReactorError};
use crate::reactor::{CallbackResult, Reactor};
use crate::timer::TimerHandle;

pub trait EventLoop: Sized {
    type Timer;

    fn run(
        &self,
        entry: impl FnOnce(&Self) -> CallbackResult,
    ) -> Result<(), ReactorError>;

    fn stop(&self);

    fn next_tick(&self, callback: impl FnOnce(&Self) -> CallbackResult + 'static);

    fn add_timer(
        &self,
        delay: Duration,
        callback: impl FnOnce(&Self) -> CallbackResult + 'static,
    ) -> Self::Timer;

    fn add_periodic_timer(
        &self,
        period: Duration,
        callback: impl FnMut(&Self) -> CallbackResult + 'static,
    ) -> Self::Timer;

    fn cancel_timer(&self, timer: &Self::Timer);

    fn reactor_running(&self) -> bool;

    fn add_shutdown_hook(&self, hook: impl FnOnce(&Self) -> CallbackResult + 'static);

    fn error_handler(
        &self,
        handler: impl FnMut(&Self, &CallbackFault) -> anyhow::Result<()> + 'static,
    );

    fn get_max_timer_count(&self) -> usize;
}

impl EventLoop for Reactor {
    type Timer = TimerHandle;

    fn run(
        &self,
        entry: impl FnOnce(&Self) -> CallbackResult,
    ) -> Result<(), ReactorError> {
        Reactor::run(self, entry)
    }

    fn stop(&self) {
        Reactor::stop(self)
    }

    fn next_tick(&self, callback: impl FnOnce(&Self) -> CallbackResult + 'static) {
        Reactor::next_tick(self, callback)
    }

    fn add_timer(
        &self,
        delay: Duration,
        callback: impl FnOnce(&Self) -> CallbackResult + 'static,
    ) -> TimerHandle {
        Reactor::add_timer(self, delay, callback)
    }

    fn add_periodic_timer(
        &self,
        period: Duration,
        callback: impl FnMut(&Self) -> CallbackResult + 'static,
    ) -> TimerHandle {
        Reactor::add_periodic_timer(self, period, callback)
    }

    fn cancel_timer(&self, timer: &TimerHandle) {
        Reactor::cancel_timer(self, timer)
    }

    fn reactor_running(&self) -> bool {
        Reactor::reactor_running(self)
    }

    fn add_shutdown_hook(&self, hook: impl FnOnce(&Self) -> CallbackResult + 'static) {
        Reactor::add_shutdown_hook(self, hook)
    }

    fn error_handler(
        &self,
        handler: impl FnMut(&Self, &CallbackFault) -> anyhow::Result<()> + 'static,
    ) {
        Reactor::error_handler(self, handler)
    }

    fn get_max_timer_count(&self) -> usize {
        Reactor::get_max_timer_count(self)
    }
}
