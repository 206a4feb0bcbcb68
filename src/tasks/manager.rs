use crate::{
    tasks::{run_daemon, run_scheduled, Cancellation},
    ApplicationConfig, DaemonConfig, DaemonContext, DynSvc, InjectError,
    InjectResult, Key, ScheduleConfig, ScheduledContext, ShutdownSignal, Svc,
    ThreadKind,
};
use derive_more::Display;
use log::{debug, error};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::atomic::{AtomicBool, Ordering},
    thread::{self, JoinHandle},
};

/// Invokes a task operation with the values of its operation scope.
pub(crate) type TaskInvoker =
    Svc<dyn Fn(&[(Key, DynSvc)]) -> InjectResult<()> + Send + Sync>;

/// Why one invocation of a task operation did not complete.
#[derive(Debug, Display)]
pub(crate) enum InvocationFailure {
    #[display(fmt = "{}", _0)]
    Failed(InjectError),
    #[display(fmt = "panicked: {}", _0)]
    Panicked(String),
}

/// Invokes a task operation once. A panic is contained to the invocation so
/// the task loop keeps running.
pub(crate) fn invoke_task(
    run: &TaskInvoker,
    operation: &[(Key, DynSvc)],
) -> Result<(), InvocationFailure> {
    match panic::catch_unwind(AssertUnwindSafe(|| run(operation))) {
        Ok(result) => result.map_err(InvocationFailure::Failed),
        Err(payload) => Err(InvocationFailure::Panicked(panic_message(
            payload.as_ref(),
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

pub(crate) enum TaskKind {
    Daemon(DaemonConfig),
    Scheduled(ScheduleConfig),
}

/// A task operation waiting to be started.
pub(crate) struct TaskSpec {
    pub name: String,
    pub kind: TaskKind,
    pub run: TaskInvoker,
}

enum Stop {
    Daemon {
        interrupted: Svc<AtomicBool>,
        interrupt: bool,
    },
    Scheduled(Svc<Cancellation>),
}

struct RunningTask {
    name: String,
    stop: Stop,
    handle: JoinHandle<()>,
}

/// Owns the threads of the daemons and scheduled operations of a running
/// application.
#[derive(Default)]
pub(crate) struct TaskManager {
    tasks: Vec<RunningTask>,
}

impl TaskManager {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Starts one task on its own thread.
    pub fn spawn(
        &mut self,
        spec: TaskSpec,
        config: &ApplicationConfig,
        signal: &Svc<ShutdownSignal>,
    ) -> InjectResult<()> {
        let TaskSpec { name, kind, run } = spec;
        let thread_kind = match &kind {
            TaskKind::Daemon(daemon) => daemon.thread_kind,
            TaskKind::Scheduled(schedule) => schedule.thread_kind,
        }
        .unwrap_or_else(|| config.default_thread_kind());

        let mut builder = thread::Builder::new().name(name.clone());
        if thread_kind == ThreadKind::Virtual {
            builder = builder.stack_size(config.virtual_stack_size());
        }

        let (stop, body): (Stop, Box<dyn FnOnce() + Send>) = match kind {
            TaskKind::Daemon(daemon) => {
                let interrupted = Svc::new(AtomicBool::new(false));
                let context = Svc::new(DaemonContext::new(
                    name.clone(),
                    signal.clone(),
                    interrupted.clone(),
                ));
                let restart_delay = daemon
                    .restart_delay
                    .unwrap_or_else(|| config.daemon_restart_delay());
                (
                    Stop::Daemon {
                        interrupted,
                        interrupt: daemon.interrupt_on_stop,
                    },
                    Box::new(move || run_daemon(context, run, restart_delay)),
                )
            }
            TaskKind::Scheduled(schedule) => {
                let cancellation = Svc::new(Cancellation::default());
                let context = Svc::new(ScheduledContext::new(
                    name.clone(),
                    schedule.period,
                    cancellation.clone(),
                ));
                let initial_delay = schedule.initial_delay;
                (
                    Stop::Scheduled(cancellation),
                    Box::new(move || run_scheduled(context, run, initial_delay)),
                )
            }
        };

        let handle = builder
            .spawn(body)
            .map_err(|inner| InjectError::TaskSpawnFailed {
                name: name.clone(),
                inner,
            })?;
        debug!("started task {name} on a {thread_kind} thread");
        self.tasks.push(RunningTask { name, stop, handle });
        Ok(())
    }

    /// Stops every task and waits for its thread to finish. The shutdown
    /// signal must already be raised so daemons leave their loop.
    pub fn stop(self) {
        for task in &self.tasks {
            match &task.stop {
                Stop::Daemon {
                    interrupted,
                    interrupt,
                } => {
                    if *interrupt {
                        interrupted.store(true, Ordering::Release);
                        task.handle.thread().unpark();
                    }
                }
                Stop::Scheduled(cancellation) => cancellation.cancel(),
            }
        }

        for task in self.tasks {
            if task.handle.join().is_err() {
                error!("task {} panicked", task.name);
            } else {
                debug!("task {} finished", task.name);
            }
        }
    }
}
