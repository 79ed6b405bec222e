//! Canned reactor workloads used by `mockreactor demo`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use anyhow::anyhow;
use clap::ValueEnum;
use mockreactor_core::prelude::*;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// One-shot timers, next-tick work and a cancelled timer
    Timers,
    /// A periodic timer that cancels itself on its fifth run
    Periodic,
    /// Shutdown hooks run newest first when a timer stops the reactor
    Shutdown,
    /// Failing callbacks absorbed by an error handler
    Faults,
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::Timers => "timers",
            Scenario::Periodic => "periodic",
            Scenario::Shutdown => "shutdown",
            Scenario::Faults => "faults",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub final_clock_ms: u64,
    pub ticks: u64,
    pub events: Vec<String>,
}

/// Shared, append-only list of what happened at which virtual time.
#[derive(Clone, Default)]
struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    fn note(&self, reactor: &Reactor, what: impl fmt::Display) {
        let line = format!("t={}ms {what}", reactor.now_millis());
        info!("{line}");
        self.0.borrow_mut().push(line);
    }

    fn into_lines(self) -> Vec<String> {
        self.0.take()
    }
}

pub fn run(scenario: Scenario, reactor: &Reactor) -> Result<ScenarioReport, ReactorError> {
    let journal = Journal::default();
    match scenario {
        Scenario::Timers => timers(reactor, journal.clone())?,
        Scenario::Periodic => periodic(reactor, journal.clone())?,
        Scenario::Shutdown => shutdown(reactor, journal.clone())?,
        Scenario::Faults => faults(reactor, journal.clone())?,
    }
    Ok(ScenarioReport {
        scenario,
        final_clock_ms: reactor.now_millis(),
        ticks: reactor.tick_count(),
        events: journal.into_lines(),
    })
}

fn timers(reactor: &Reactor, journal: Journal) -> Result<(), ReactorError> {
    reactor.run(move |r| {
        for secs in [5u64, 1, 3] {
            let journal = journal.clone();
            r.add_timer(Duration::from_secs(secs), move |r| {
                journal.note(r, format!("{secs}s timer fired"));
                Ok(())
            });
        }
        let cancelled = {
            let journal = journal.clone();
            r.add_timer(Duration::from_secs(2), move |r| {
                journal.note(r, "cancelled timer fired");
                Ok(())
            })
        };
        r.cancel_timer(&cancelled);

        let journal = journal.clone();
        r.next_tick(move |r| {
            journal.note(r, "next tick");
            Ok(())
        });
        Ok(())
    })
}

fn periodic(reactor: &Reactor, journal: Journal) -> Result<(), ReactorError> {
    reactor.run(move |r| {
        let slot: Rc<RefCell<Option<TimerHandle>>> = Rc::new(RefCell::new(None));
        let runs = Rc::new(RefCell::new(0u32));
        let handle = {
            let (journal, slot) = (journal.clone(), slot.clone());
            r.add_periodic_timer(Duration::from_secs(10), move |r| {
                let run = {
                    let mut runs = runs.borrow_mut();
                    *runs += 1;
                    *runs
                };
                journal.note(r, format!("periodic run #{run}"));
                if run == 5 {
                    if let Some(handle) = slot.borrow().as_ref() {
                        r.cancel_timer(handle);
                    }
                }
                Ok(())
            })
        };
        slot.replace(Some(handle));

        r.add_timer(Duration::from_secs(25), move |r| {
            journal.note(r, "one-shot between periodic runs");
            Ok(())
        });
        Ok(())
    })
}

fn shutdown(reactor: &Reactor, journal: Journal) -> Result<(), ReactorError> {
    reactor.run(move |r| {
        for name in ["first", "second", "third"] {
            let journal = journal.clone();
            r.add_shutdown_hook(move |r| {
                journal.note(r, format!("{name} shutdown hook"));
                Ok(())
            });
        }
        {
            let journal = journal.clone();
            r.add_timer(Duration::from_secs(60), move |r| {
                journal.note(r, "stopping");
                r.stop();
                Ok(())
            });
        }
        r.add_timer(Duration::from_secs(120), move |r| {
            journal.note(r, "timer after stop fired");
            Ok(())
        });
        Ok(())
    })
}

fn faults(reactor: &Reactor, journal: Journal) -> Result<(), ReactorError> {
    {
        let journal = journal.clone();
        reactor.error_handler(move |r, fault| {
            journal.note(r, format!("handled: {fault}"));
            Ok(())
        });
    }
    reactor.run(move |r| {
        r.add_timer(Duration::from_secs(2), |_| Err(anyhow!("disk full")));

        let attempts = Rc::new(RefCell::new(0u32));
        let handle = {
            let journal = journal.clone();
            r.add_periodic_timer(Duration::from_secs(3), move |r| {
                let attempt = {
                    let mut attempts = attempts.borrow_mut();
                    *attempts += 1;
                    *attempts
                };
                if attempt == 1 {
                    return Err(anyhow!("flaky first attempt"));
                }
                journal.note(r, format!("periodic attempt #{attempt} ok"));
                Ok(())
            })
        };
        let id = handle.id();
        r.add_timer(Duration::from_secs(10), move |r| {
            journal.note(r, format!("cancelling periodic {id}"));
            r.cancel_timer_by_id(id);
            Ok(())
        });
        Ok(())
    })
}
