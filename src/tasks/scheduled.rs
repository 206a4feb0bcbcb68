use crate::{tasks::invoke_task, DynSvc, Key, Svc, TaskInvoker};
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Cancels one scheduled operation, waking it if it is waiting.
#[derive(Debug, Default)]
pub(crate) struct Cancellation {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl Cancellation {
    pub fn cancel(&self) {
        *self.cancelled.lock() = true;
        self.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }

    /// Waits until `deadline` or until cancelled. Returns whether the
    /// operation was cancelled.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut cancelled = self.cancelled.lock();
        while !*cancelled {
            if self.wake.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}

/// Passed to a scheduled operation on every invocation.
pub struct ScheduledContext {
    name: String,
    period: Duration,
    iteration: AtomicU64,
    cancellation: Svc<Cancellation>,
}

impl ScheduledContext {
    pub(crate) fn new(
        name: String,
        period: Duration,
        cancellation: Svc<Cancellation>,
    ) -> Self {
        ScheduledContext {
            name,
            period,
            iteration: AtomicU64::new(0),
            cancellation,
        }
    }

    /// The name of the operation, which is also the name of its thread.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The time between two invocations.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// The number of the current invocation, starting at 1.
    #[must_use]
    pub fn iteration(&self) -> u64 {
        self.iteration.load(Ordering::Acquire)
    }

    /// Whether the operation was cancelled because the application is
    /// stopping.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Invokes the operation at a fixed rate until it is cancelled. An
/// invocation that overruns its period is followed by the next one right
/// away, and missed invocations are not made up.
pub(crate) fn run_scheduled(
    context: Svc<ScheduledContext>,
    run: TaskInvoker,
    initial_delay: Duration,
) {
    let value: DynSvc = context.clone();
    let operation = [(Key::of::<ScheduledContext>(), value)];
    let period = context.period().max(Duration::from_millis(1));

    debug!("scheduled operation {} started", context.name());
    let mut next = Instant::now() + initial_delay;
    while !context.cancellation.wait_until(next) {
        context.iteration.fetch_add(1, Ordering::AcqRel);
        if let Err(error) = invoke_task(&run, &operation) {
            warn!("scheduled operation {} failed: {error}", context.name());
        }
        next = (next + period).max(Instant::now());
    }
    debug!("scheduled operation {} stopped", context.name());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InjectError;
    use std::thread;

    #[test]
    fn cancelling_wakes_the_operation() {
        let cancellation = Svc::new(Cancellation::default());
        let context = Svc::new(ScheduledContext::new(
            "idle".to_owned(),
            Duration::from_secs(3600),
            cancellation.clone(),
        ));
        let run: TaskInvoker = Svc::new(|_: &[(Key, DynSvc)]| Ok(()));

        let started = Instant::now();
        let handle = {
            let context = context.clone();
            thread::spawn(move || {
                run_scheduled(context, run, Duration::from_secs(3600));
            })
        };
        cancellation.cancel();
        handle.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(0, context.iteration());
        assert!(context.is_cancelled());
    }

    #[test]
    fn failures_do_not_stop_the_schedule() {
        let cancellation = Svc::new(Cancellation::default());
        let context = Svc::new(ScheduledContext::new(
            "failing".to_owned(),
            Duration::from_millis(1),
            cancellation.clone(),
        ));
        let run: TaskInvoker = Svc::new(move |operation: &[(Key, DynSvc)]| {
            let context = operation[0]
                .1
                .clone()
                .downcast_arc::<ScheduledContext>()
                .unwrap_or_else(|_| panic!("not a scheduled context"));
            if context.iteration() == 3 {
                cancellation.cancel();
            }
            Err(InjectError::NotInitialized)
        });

        run_scheduled(context.clone(), run, Duration::ZERO);
        assert_eq!(3, context.iteration());
    }

    #[test]
    fn panicking_ticks_do_not_stop_the_schedule() {
        let cancellation = Svc::new(Cancellation::default());
        let context = Svc::new(ScheduledContext::new(
            "panicking".to_owned(),
            Duration::from_millis(1),
            cancellation.clone(),
        ));
        let run: TaskInvoker = Svc::new(move |operation: &[(Key, DynSvc)]| {
            let context = operation[0]
                .1
                .clone()
                .downcast_arc::<ScheduledContext>()
                .unwrap_or_else(|_| panic!("not a scheduled context"));
            if context.iteration() == 2 {
                cancellation.cancel();
                return Ok(());
            }
            panic!("tick {} exploded", context.iteration());
        });

        run_scheduled(context.clone(), run, Duration::ZERO);
        assert_eq!(2, context.iteration());
    }
}
