//! Property tests for timer ordering and cancellation.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use mockreactor_core::prelude::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn timers_fire_in_delay_order_ties_by_registration(delays in prop::collection::vec(0u64..5_000, 1..40)) {
        let reactor = Reactor::new();
        let fired: Rc<RefCell<Vec<(usize, u64)>>> = Rc::new(RefCell::new(Vec::new()));
        let registered = delays.clone();
        let sink = fired.clone();
        reactor
            .run(move |r| {
                for (index, delay) in registered.iter().copied().enumerate() {
                    let sink = sink.clone();
                    r.add_timer(Duration::from_millis(delay), move |r| {
                        sink.borrow_mut().push((index, r.now_millis()));
                        Ok(())
                    });
                }
                Ok(())
            })
            .unwrap();

        let mut expected: Vec<(usize, u64)> = delays.iter().copied().enumerate().collect();
        expected.sort_by_key(|&(index, delay)| (delay, index));
        prop_assert_eq!(fired.borrow().clone(), expected);
    }

    #[test]
    fn cancelled_timers_never_fire(
        timers in prop::collection::vec((1u64..2_000, any::<bool>()), 1..30)
    ) {
        let reactor = Reactor::new();
        let fired: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let plan = timers.clone();
        let sink = fired.clone();
        reactor
            .run(move |r| {
                for (index, (delay, cancel)) in plan.iter().copied().enumerate() {
                    let sink = sink.clone();
                    let handle = r.add_timer(Duration::from_millis(delay), move |_| {
                        sink.borrow_mut().push(index);
                        Ok(())
                    });
                    if cancel {
                        r.cancel_timer(&handle);
                    }
                }
                Ok(())
            })
            .unwrap();

        let fired = fired.borrow();
        for (index, (_, cancel)) in timers.iter().enumerate() {
            prop_assert_eq!(fired.contains(&index), !cancel);
        }
        prop_assert_eq!(reactor.active_timer_count(), 0);
    }

    #[test]
    fn periodic_cancelled_on_nth_run_runs_n_times(period in 1u64..1_000, n in 1u32..20) {
        let reactor = Reactor::new();
        let count = Rc::new(RefCell::new(0u32));
        let slot: Rc<RefCell<Option<TimerHandle>>> = Rc::new(RefCell::new(None));
        let (c, s) = (count.clone(), slot.clone());
        reactor
            .run(move |r| {
                let handle = r.add_periodic_timer(Duration::from_millis(period), move |r| {
                    *c.borrow_mut() += 1;
                    if *c.borrow() == n {
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
        prop_assert_eq!(*count.borrow(), n);
        prop_assert_eq!(reactor.now_millis(), period * u64::from(n));
    }
}
