//! The virtual-clock reactor.
//!
//! A single-threaded stand-in for an event loop. Work registered through
//! [`Reactor::next_tick`], [`Reactor::add_timer`] and
//! [`Reactor::add_periodic_timer`] is driven by [`Reactor::run`], which jumps
//! the virtual clock over idle time instead of sleeping and returns once there
//! is nothing left to do or [`Reactor::stop`] was called.
//!
//! Every callback receives `&Reactor` so it can register more work, cancel
//! timers or stop the loop. Such calls take effect at the next scheduling
//! decision; the list of callbacks already collected for the current tick
//! always runs to completion.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use mockreactor_config::ReactorConfig;
use mockreactor_telemetry::{PrefixedLog, ReactorLog, ReactorMetrics, TracingLog};

use crate::error::{CallbackFault, FaultSource, ReactorError};
use crate::fault::{Execution, FaultPolicy};
use crate::hooks::ShutdownHookRegistry;
use crate::queue::{ScheduledTask, TaskQueue};
use crate::time::{duration_to_millis, TimeControl, VirtualClock};
use crate::timer::{TimerHandle, TimerId, TimerRegistry};

pub type CallbackResult = anyhow::Result<()>;
pub type Callback = Box<dyn FnOnce(&Reactor) -> CallbackResult>;
pub type PeriodicCallback = Box<dyn FnMut(&Reactor) -> CallbackResult>;

pub(crate) enum TaskKind {
    Once(Callback),
    Periodic {
        period_ms: u64,
        callback: PeriodicCallback,
    },
}

pub(crate) struct TimerTask {
    handle: TimerHandle,
    kind: TaskKind,
}

pub struct Reactor {
    clock: VirtualClock,
    tick_step_ms: u64,
    start_millis: u64,
    max_timer_count: usize,

    tasks: RefCell<TaskQueue<TimerTask>>,
    next_tick: RefCell<Vec<Callback>>,
    timers: TimerRegistry,
    hooks: ShutdownHookRegistry,
    faults: FaultPolicy,

    running: Cell<bool>,
    stopped: Cell<bool>,
    tick_count: Cell<u64>,
    // Unhandled shutdown-hook fault, surfaced by `run` after the callback that stopped.
    deferred_fault: RefCell<Option<ReactorError>>,

    log: PrefixedLog<Box<dyn ReactorLog>>,
    metrics: Option<ReactorMetrics>,
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor {
    /// A reactor with default configuration, logging through `tracing`.
    pub fn new() -> Self {
        Self::with_config(&ReactorConfig::default())
    }

    pub fn with_config(config: &ReactorConfig) -> Self {
        let metrics = config
            .telemetry
            .metrics_enabled
            .then(ReactorMetrics::new);
        Self {
            clock: VirtualClock::new(config.clock.start_millis),
            tick_step_ms: config.clock.tick_step_ms,
            start_millis: config.clock.start_millis,
            max_timer_count: config.timers.max_timer_count,
            tasks: RefCell::new(TaskQueue::new()),
            next_tick: RefCell::new(Vec::new()),
            timers: TimerRegistry::default(),
            hooks: ShutdownHookRegistry::default(),
            faults: FaultPolicy::default(),
            running: Cell::new(false),
            stopped: Cell::new(false),
            tick_count: Cell::new(0),
            deferred_fault: RefCell::new(None),
            log: PrefixedLog::new(
                config.telemetry.log_prefix.clone(),
                Box::new(TracingLog) as Box<dyn ReactorLog>,
            ),
            metrics,
        }
    }

    /// Loads configuration from the default file/environment hierarchy.
    pub fn from_env() -> Result<Self, ReactorError> {
        let config = ReactorConfig::load()?;
        Ok(Self::with_config(&config))
    }

    /// Replaces the log sink, keeping the configured prefix.
    pub fn with_logger(mut self, log: impl ReactorLog + 'static) -> Self {
        let prefix = self.log.prefix().to_string();
        self.log = PrefixedLog::new(prefix, Box::new(log) as Box<dyn ReactorLog>);
        self
    }

    pub fn with_time_control(mut self, control: impl TimeControl + 'static) -> Self {
        self.clock = VirtualClock::with_control(self.start_millis, control);
        self
    }

    pub fn with_metrics(mut self, metrics: ReactorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn log(&self) -> &dyn ReactorLog {
        &self.log
    }

    pub fn metrics(&self) -> Option<&ReactorMetrics> {
        self.metrics.as_ref()
    }

    /// Runs `entry`, then ticks until stopped or out of work.
    ///
    /// Returns the first fault that no error handler absorbed.
    pub fn run<F>(&self, entry: F) -> Result<(), ReactorError>
    where
        F: FnOnce(&Reactor) -> CallbackResult,
    {
        let _guard = RunGuard::enter(self);
        self.log.info("run called. executing entry callback.");
        self.execute(FaultSource::Entry, entry)?;

        self.log.info("Beginning tick loop.");
        // Set after an idle jump: the clock already sits on the next fire time.
        let mut jumped = false;
        while !self.stopped.get() {
            let tick = self.tick_count.get() + 1;
            self.tick_count.set(tick);
            if let Some(metrics) = &self.metrics {
                metrics.record_tick();
            }

            if self.tick_step_ms > 0 && !jumped {
                self.clock.advance_by(self.tick_step_ms);
            }
            jumped = false;
            let now = self.clock.now_millis();
            let popped = self.tasks.borrow_mut().pop_due(now);
            let popped_count = popped.len();
            let immediate = self.next_tick.take();
            self.log.info(&format!(
                "Tick #{tick}, clock={now}, due_tasks={popped_count}, next_tick_procs={}",
                immediate.len()
            ));
            // Cancellation is decided here; later cancels cannot retract collected work.
            let due: Vec<TimerTask> = popped
                .into_iter()
                .filter_map(|scheduled| self.admit(scheduled))
                .collect();

            if popped_count == 0 && immediate.is_empty() {
                let next_time = self.tasks.borrow().peek_next_fire_time();
                match next_time {
                    None => {
                        self.log.info("Nothing left to do! Returning.");
                        break;
                    }
                    Some(next_time) => {
                        let delta = next_time - now;
                        self.log.info(&format!(
                            "Nothing in this tick. Accelerating clock by {}s to: {next_time}",
                            delta as f64 / 1000.0
                        ));
                        self.clock.advance_to(next_time)?;
                        if let Some(metrics) = &self.metrics {
                            metrics.record_idle_jump(delta);
                        }
                        jumped = true;
                        continue;
                    }
                }
            }

            let mut index = 0;
            for task in due {
                index += 1;
                self.log.debug(&format!("Executing tick proc #{index}"));
                self.fire(task)?;
            }
            for callback in immediate {
                index += 1;
                self.log.debug(&format!("Executing tick proc #{index}"));
                self.execute(FaultSource::NextTick, callback)?;
            }
        }
        self.log.info("Finished tick loop. Returning.");
        Ok(())
    }

    /// Stops the loop after the current tick, discards all pending work and
    /// runs the shutdown hooks newest first. Safe to call repeatedly and
    /// outside of `run`.
    pub fn stop(&self) {
        self.log.info("stop called");
        self.stopped.set(true);
        self.discard_pending();

        let hooks = self.hooks.take_for_shutdown();
        if hooks.is_empty() {
            return;
        }
        self.log
            .info(&format!("Executing {} shutdown hooks", hooks.len()));
        for hook in hooks {
            if let Err(err) = self.faults.isolate(self, FaultSource::ShutdownHook, hook) {
                self.park_fault(err);
            }
        }
    }

    /// Queues `callback` for the next tick. It runs exactly once and cannot be cancelled.
    pub fn next_tick<F>(&self, callback: F)
    where
        F: FnOnce(&Reactor) -> CallbackResult + 'static,
    {
        self.log.info("Adding proc to next_tick");
        self.next_tick.borrow_mut().push(Box::new(callback));
    }

    /// Schedules `callback` to run once, `delay` after the current virtual time.
    pub fn add_timer<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce(&Reactor) -> CallbackResult + 'static,
    {
        let handle = self.timers.create();
        let delay_ms = duration_to_millis(delay);
        self.log.info(&format!(
            "Adding timer task: id={}, delay_ms={delay_ms}",
            handle.id()
        ));
        self.schedule(delay_ms, handle.clone(), TaskKind::Once(Box::new(callback)));
        handle
    }

    /// Schedules `callback` every `period` until its handle is cancelled or
    /// the reactor stops. A zero period fires on every tick.
    pub fn add_periodic_timer<F>(&self, period: Duration, callback: F) -> TimerHandle
    where
        F: FnMut(&Reactor) -> CallbackResult + 'static,
    {
        let handle = self.timers.create();
        let period_ms = duration_to_millis(period);
        self.log.info(&format!(
            "Creating periodic timer task: id={}, period_ms={period_ms}",
            handle.id()
        ));
        self.schedule(
            period_ms,
            handle.clone(),
            TaskKind::Periodic {
                period_ms,
                callback: Box::new(callback),
            },
        );
        handle
    }

    /// Cancels `handle`. Idempotent; unknown handles are accepted.
    ///
    /// The queued task stays in the queue and is skipped when it comes due.
    pub fn cancel_timer(&self, handle: &TimerHandle) {
        if !self.timers.forget(handle) && !handle.is_cancelled() {
            self.log.debug(&format!(
                "cancel_timer: id={} is not an active timer",
                handle.id()
            ));
        }
        self.log
            .info(&format!("Cancelling timer id={}", handle.id()));
        handle.cancel();
    }

    /// Cancels the active timer with `id`. Returns whether one was found.
    pub fn cancel_timer_by_id(&self, id: TimerId) -> bool {
        match self.timers.find(id) {
            Some(handle) => {
                self.cancel_timer(&handle);
                true
            }
            None => {
                self.log
                    .debug(&format!("cancel_timer_by_id: no active timer {id}"));
                false
            }
        }
    }

    pub fn reactor_running(&self) -> bool {
        self.running.get()
    }

    pub fn add_shutdown_hook<F>(&self, hook: F)
    where
        F: FnOnce(&Reactor) -> CallbackResult + 'static,
    {
        self.hooks.register(Box::new(hook));
    }

    /// Installs the single error handler, replacing any previous one.
    pub fn error_handler<F>(&self, handler: F)
    where
        F: FnMut(&Reactor, &CallbackFault) -> anyhow::Result<()> + 'static,
    {
        self.log.info("Setting error_handler");
        self.faults.set_handler(Box::new(handler));
    }

    /// Advisory only; the number of pending timers is never checked against it.
    pub fn get_max_timer_count(&self) -> usize {
        self.max_timer_count
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count.get()
    }

    pub fn active_timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Queued timer tasks, including cancelled ones not yet skipped.
    pub fn pending_task_count(&self) -> usize {
        self.tasks.borrow().len()
    }

    fn schedule(&self, delay_ms: u64, handle: TimerHandle, kind: TaskKind) {
        let fire_at = self.clock.now_millis().saturating_add(delay_ms);
        self.tasks
            .borrow_mut()
            .add_task(fire_at, TimerTask { handle, kind });
    }

    /// Drops a popped task whose handle is already cancelled.
    fn admit(&self, scheduled: ScheduledTask<TimerTask>) -> Option<TimerTask> {
        let task = scheduled.task;
        if !task.handle.is_cancelled() {
            return Some(task);
        }
        self.log.debug(&format!(
            "Skipping timer task id={}, it's already cancelled",
            task.handle.id()
        ));
        if let Some(metrics) = &self.metrics {
            metrics.record_cancelled_skip();
        }
        None
    }

    fn fire(&self, task: TimerTask) -> Result<(), ReactorError> {
        let TimerTask { handle, kind } = task;
        match kind {
            TaskKind::Once(callback) => {
                self.timers.forget(&handle);
                self.execute(FaultSource::Timer(handle.id()), callback)
            }
            TaskKind::Periodic {
                period_ms,
                mut callback,
            } => {
                self.execute(FaultSource::PeriodicTimer(handle.id()), |reactor| {
                    callback(reactor)
                })?;
                if handle.is_cancelled() {
                    self.log.debug(&format!(
                        "Periodic timer id={} cancelled during its run, not rescheduling",
                        handle.id()
                    ));
                } else if self.stopped.get() {
                    self.log.debug(&format!(
                        "Reactor stopped, not rescheduling periodic timer id={}",
                        handle.id()
                    ));
                } else {
                    self.log.info(&format!(
                        "Rescheduling next run of periodic timer id={}",
                        handle.id()
                    ));
                    self.schedule(
                        period_ms,
                        handle,
                        TaskKind::Periodic {
                            period_ms,
                            callback,
                        },
                    );
                }
                Ok(())
            }
        }
    }

    fn execute<F>(&self, origin: FaultSource, callback: F) -> Result<(), ReactorError>
    where
        F: FnOnce(&Reactor) -> CallbackResult,
    {
        if let Some(metrics) = &self.metrics {
            metrics.record_callback();
        }
        let execution = self.faults.isolate(self, origin, callback)?;
        if execution == Execution::Handled {
            self.log.debug(&format!("{origin} fault handled, continuing"));
        }
        match self.deferred_fault.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Drops every queued next-tick callback and timer task, and forgets all
    /// active timers. Callbacks are dropped after the borrows are released.
    fn discard_pending(&self) {
        let immediate = self.next_tick.take();
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        self.timers.clear();
        if !immediate.is_empty() || !tasks.is_empty() {
            self.log.debug(&format!(
                "Discarding {} next_tick procs and {} timer tasks",
                immediate.len(),
                tasks.len()
            ));
        }
    }

    fn park_fault(&self, err: ReactorError) {
        if !self.running.get() {
            self.log.error(&format!(
                "Dropping shutdown hook fault raised outside of run: {err}"
            ));
            return;
        }
        let mut deferred = self.deferred_fault.borrow_mut();
        if deferred.is_none() {
            *deferred = Some(err);
        } else {
            self.log
                .error(&format!("Dropping additional shutdown hook fault: {err}"));
        }
    }
}

/// Marks the reactor running for the lifetime of one `run` call.
///
/// Dropping it resets the flag and releases the time control even when a
/// fault or panic leaves `run` early.
struct RunGuard<'r> {
    reactor: &'r Reactor,
}

impl<'r> RunGuard<'r> {
    fn enter(reactor: &'r Reactor) -> Self {
        reactor.running.set(true);
        reactor.stopped.set(false);
        reactor.tick_count.set(0);
        reactor.deferred_fault.replace(None);
        // Timers registered between runs keep their delay relative to the new start.
        let previous = reactor.clock.now_millis();
        reactor.clock.reset(reactor.start_millis);
        reactor
            .tasks
            .borrow_mut()
            .rebase(previous, reactor.start_millis);
        Self { reactor }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.reactor.running.set(false);
        if self.reactor.stopped.get() {
            // Work registered after `stop` by later callbacks or by hooks.
            self.reactor.discard_pending();
        }
        let saved_ms = self.reactor.clock.release();
        self.reactor.log.debug(&format!(
            "Reactor saved you {} seconds.",
            saved_ms as f64 / 1000.0
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use mockreactor_telemetry::MemoryLog;
    use std::rc::Rc;

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    #[test]
    fn run_and_stop() {
        let reactor = Reactor::new();
        let inside = counter();
        let after_stop = counter();
        let (i, a) = (inside.clone(), after_stop.clone());
        reactor
            .run(move |r| {
                i.set(1);
                r.stop();
                a.set(1);
                Ok(())
            })
            .unwrap();
        assert_eq!(inside.get(), 1);
        assert_eq!(after_stop.get(), 1);
        assert_eq!(reactor.tick_count(), 0);
    }

    #[test]
    fn empty_entry_returns_after_one_idle_tick() {
        let reactor = Reactor::new();
        reactor.run(|_| Ok(())).unwrap();
        assert_eq!(reactor.tick_count(), 1);
        assert_eq!(reactor.now_millis(), 0);
    }

    #[test]
    fn idle_time_is_skipped_then_due_task_runs_next_tick() {
        let reactor = Reactor::new();
        let fired_at = Rc::new(Cell::new(0));
        let f = fired_at.clone();
        reactor
            .run(move |r| {
                r.add_timer(Duration::from_secs(5), move |r| {
                    f.set(r.now_millis());
                    Ok(())
                });
                Ok(())
            })
            .unwrap();
        assert_eq!(fired_at.get(), 5_000);
        // idle tick at 0, firing tick at 5000, final idle tick
        assert_eq!(reactor.tick_count(), 3);
    }

    #[test]
    fn fixed_tick_step_advances_every_tick() {
        let mut config = ReactorConfig::default();
        config.clock.tick_step_ms = 100;
        let reactor = Reactor::with_config(&config);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        reactor
            .run(move |r| {
                let s2 = s.clone();
                r.next_tick(move |r| {
                    s2.borrow_mut().push(r.now_millis());
                    Ok(())
                });
                Ok(())
            })
            .unwrap();
        assert_eq!(*seen.borrow(), vec![100]);
        assert_eq!(reactor.now_millis(), 200);
    }

    #[test]
    fn periodic_rearm_stops_when_handle_cancelled_in_callback() {
        let reactor = Reactor::new();
        let count = counter();
        let slot: Rc<RefCell<Option<TimerHandle>>> = Rc::new(RefCell::new(None));
        let (c, s) = (count.clone(), slot.clone());
        reactor
            .run(move |r| {
                let handle = r.add_periodic_timer(Duration::from_millis(100), move |r| {
                    c.set(c.get() + 1);
                    if c.get() == 2 {
                        if let Some(h) = s.borrow().as_ref() {
                            r.cancel_timer(h);
                        }
                    }
                    Ok(())
                });
                slot.replace(Some(handle));
                Ok(())
            })
            .unwrap();
        assert_eq!(count.get(), 2);
        assert_eq!(reactor.pending_task_count(), 0);
    }

    #[test]
    fn fired_one_shot_leaves_active_registry() {
        let reactor = Reactor::new();
        let handle = reactor.add_timer(Duration::from_millis(10), |_| Ok(()));
        assert_eq!(reactor.active_timer_count(), 1);
        reactor.run(|_| Ok(())).unwrap();
        assert_eq!(reactor.active_timer_count(), 0);
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn cancel_by_id_finds_active_timer() {
        let reactor = Reactor::new();
        let fired = counter();
        let f = fired.clone();
        let handle = reactor.add_timer(Duration::from_millis(10), move |_| {
            f.set(1);
            Ok(())
        });
        assert!(reactor.cancel_timer_by_id(handle.id()));
        assert!(!reactor.cancel_timer_by_id(handle.id()));
        assert!(handle.is_cancelled());
        reactor.run(|_| Ok(())).unwrap();
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn entry_fault_without_handler_propagates() {
        let reactor = Reactor::new();
        let err = reactor.run(|_| Err(anyhow!("entry broke"))).unwrap_err();
        assert_eq!(err.as_fault().unwrap().origin(), FaultSource::Entry);
        assert!(!reactor.reactor_running());
    }

    #[test]
    fn hook_fault_surfaces_from_run() {
        let reactor = Reactor::new();
        let err = reactor
            .run(|r| {
                r.add_shutdown_hook(|_| Err(anyhow!("hook broke")));
                r.stop();
                Ok(())
            })
            .unwrap_err();
        assert_eq!(
            err.as_fault().unwrap().origin(),
            FaultSource::ShutdownHook
        );
    }

    #[test]
    fn hook_fault_outside_run_is_logged() {
        let log = MemoryLog::new();
        let reactor = Reactor::new().with_logger(log.clone());
        reactor.add_shutdown_hook(|_| Err(anyhow!("late hook")));
        reactor.stop();
        assert!(log.contains("Dropping shutdown hook fault raised outside of run"));
    }

    #[test]
    fn logs_carry_configured_prefix() {
        let mut config = ReactorConfig::default();
        config.telemetry.log_prefix = "MockEM".into();
        let log = MemoryLog::new();
        let reactor = Reactor::with_config(&config).with_logger(log.clone());
        reactor.run(|_| Ok(())).unwrap();
        assert!(log.contains("MockEM: run called"));
        assert!(log.contains("MockEM: Nothing left to do! Returning."));
    }

    #[test]
    fn metrics_track_ticks_and_skips() {
        let metrics = ReactorMetrics::new();
        let reactor = Reactor::new().with_metrics(metrics.clone());
        reactor
            .run(|r| {
                let h = r.add_timer(Duration::from_secs(1), |_| Ok(()));
                r.cancel_timer(&h);
                Ok(())
            })
            .unwrap();
        assert_eq!(metrics.cancelled_skips.get(), 1);
        assert_eq!(metrics.skipped_virtual_ms.get(), 1_000);
        assert_eq!(metrics.ticks.get(), 3);
    }
}
