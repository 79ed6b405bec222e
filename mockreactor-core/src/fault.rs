//! Fault isolation around callback execution.
//!
//! A callback fault goes to the registered error handler when there is one
//! and the loop carries on. Without a handler the fault becomes the result of
//! `Reactor::run`. The handler itself runs unguarded.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use mockreactor_telemetry::ReactorLog;

use crate::error::{CallbackFault, FaultSource, ReactorError};
use crate::reactor::{CallbackResult, Reactor};

pub type ErrorHandler = Box<dyn FnMut(&Reactor, &CallbackFault) -> anyhow::Result<()>>;

/// How a guarded callback finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Completed,
    Handled,
}

#[derive(Default)]
pub struct FaultPolicy {
    handler: RefCell<Option<ErrorHandler>>,
    // Bumped on every replacement so a handler that installs its successor
    // is not put back afterwards.
    generation: Cell<u64>,
    // Faults raised while a handler call is in progress, delivered once it returns.
    pending: RefCell<VecDeque<CallbackFault>>,
    dispatching: Cell<bool>,
}

impl FaultPolicy {
    pub fn set_handler(&self, handler: ErrorHandler) {
        self.generation.set(self.generation.get() + 1);
        self.handler.replace(Some(handler));
    }

    pub fn has_handler(&self) -> bool {
        self.handler.borrow().is_some()
    }

    /// Runs `callback`, routing an `Err` through [`FaultPolicy::dispatch`].
    pub fn isolate<F>(
        &self,
        reactor: &Reactor,
        origin: FaultSource,
        callback: F,
    ) -> Result<Execution, ReactorError>
    where
        F: FnOnce(&Reactor) -> CallbackResult,
    {
        match callback(reactor) {
            Ok(()) => Ok(Execution::Completed),
            Err(error) => self.dispatch(reactor, CallbackFault::new(origin, error)),
        }
    }

    /// Hands `fault` to the error handler.
    ///
    /// A fault raised by something the handler itself triggered (a shutdown
    /// hook run by `stop`, say) is queued and delivered after the running
    /// handler call returns, to whichever handler is installed by then.
    pub fn dispatch(
        &self,
        reactor: &Reactor,
        fault: CallbackFault,
    ) -> Result<Execution, ReactorError> {
        if self.dispatching.get() {
            reactor.log().warn(&format!(
                "Fault raised while error_handler is running, queueing: {fault}"
            ));
            self.pending.borrow_mut().push_back(fault);
            return Ok(Execution::Handled);
        }

        let mut fault = fault;
        loop {
            let taken = self.handler.borrow_mut().take();
            let Some(mut handler) = taken else {
                reactor.log().error(&format!("Unhandled fault: {fault}"));
                return Err(ReactorError::Callback(fault));
            };

            reactor
                .log()
                .warn(&format!("Caught fault, passing to error_handler: {fault}"));
            if let Some(metrics) = reactor.metrics() {
                metrics.record_handled_fault();
            }

            let generation = self.generation.get();
            self.dispatching.set(true);
            let outcome = handler(reactor, &fault);
            self.dispatching.set(false);
            if self.generation.get() == generation {
                self.handler.replace(Some(handler));
            }

            if let Err(error) = outcome {
                reactor
                    .log()
                    .error(&format!("error_handler failed: {error:#}"));
                let dropped = std::mem::take(&mut *self.pending.borrow_mut());
                for queued in dropped {
                    reactor
                        .log()
                        .error(&format!("Dropping queued fault after handler failure: {queued}"));
                }
                return Err(ReactorError::Handler {
                    origin: fault.origin(),
                    error,
                });
            }

            let next = self.pending.borrow_mut().pop_front();
            match next {
                Some(queued) => fault = queued,
                None => return Ok(Execution::Handled),
            }
        }
    }
}
