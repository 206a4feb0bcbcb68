use crate::{
    beans::OperationKind,
    runtime::{Evaluator, ImageData, StopAction},
    Accessor, ApplicationContext, Assembly, ContainerId, DynSvc, InjectError,
    InjectResult, Key, LifetimeArena, LifetimeError, LifetimeState,
    ManagedLifetimeController, Service, ServiceInfo, ShutdownSignal, Svc,
    TaskInvoker, TaskKind, TaskManager, TaskSpec,
};
use log::{debug, error, info};
use parking_lot::{Mutex, RwLock};
use std::time::Duration;

struct ApplicationInner {
    image: Svc<ImageData>,
    controller: Svc<ManagedLifetimeController>,
    shutdown: Svc<ShutdownSignal>,
    arena: RwLock<Option<Svc<LifetimeArena>>>,
    tasks: Mutex<Option<TaskManager>>,
}

/// A live instance of an [`ApplicationImage`](crate::ApplicationImage).
///
/// Cloning an application gives another handle to the same instance.
///
/// ```
/// use bean_injector::{Application, IntoSingleton, LifetimeState};
///
/// struct Greeter;
///
/// impl Greeter {
///     fn new() -> Self {
///         Greeter
///     }
/// }
///
/// let mut builder = Application::builder("hello");
/// builder.install(Greeter::new.singleton());
/// let application = builder.build().unwrap().new_application();
///
/// application.initialize().unwrap();
/// assert_eq!(LifetimeState::Initialized, application.state());
/// assert!(application.get::<Greeter>().is_ok());
///
/// application.start().unwrap();
/// application.stop().unwrap();
/// assert_eq!(LifetimeState::Terminated, application.state());
/// ```
#[derive(Clone)]
pub struct Application {
    inner: Svc<ApplicationInner>,
}

impl Application {
    /// Starts assembling an application named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> Assembly {
        Assembly::new(name)
    }

    pub(crate) fn new(image: Svc<ImageData>) -> Self {
        Application {
            inner: Svc::new(ApplicationInner {
                image,
                controller: Svc::new(ManagedLifetimeController::new()),
                shutdown: Svc::new(ShutdownSignal::new()),
                arena: RwLock::new(None),
                tasks: Mutex::new(None),
            }),
        }
    }

    /// The name of the application.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.image.name
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> LifetimeState {
        self.inner.controller.state()
    }

    /// The controller driving the lifecycle of this application.
    #[must_use]
    pub fn controller(&self) -> &ManagedLifetimeController {
        &self.inner.controller
    }

    /// Blocks until the application reaches `target`.
    pub fn await_state(
        &self,
        target: LifetimeState,
    ) -> Result<(), LifetimeError> {
        self.inner.controller.await_state(target)
    }

    /// Blocks until the application reaches `target` or until `timeout` has
    /// passed. Returns whether `target` was reached.
    pub fn await_state_timeout(
        &self,
        target: LifetimeState,
        timeout: Duration,
    ) -> Result<bool, LifetimeError> {
        self.inner.controller.await_state_timeout(target, timeout)
    }

    /// The signal raised when the application begins to shut down.
    #[must_use]
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.inner.shutdown
    }

    /// The arena of the application, once it is initialized.
    #[must_use]
    pub fn arena(&self) -> Option<Svc<LifetimeArena>> {
        self.inner.arena.read().clone()
    }

    fn live_arena(&self) -> InjectResult<Svc<LifetimeArena>> {
        self.arena().ok_or(InjectError::NotInitialized)
    }

    /// Creates every singleton, in dependency order.
    ///
    /// If any operation fails, the partially written arena is discarded and
    /// the application is terminated.
    pub fn initialize(&self) -> Result<(), LifetimeError> {
        let inner = &self.inner;
        inner.controller.transition(
            "initialize",
            LifetimeState::Uninitialized,
            LifetimeState::Initializing,
        )?;
        debug!("initializing application {}", self.name());

        let image = &inner.image;
        let arena = Svc::new(image.layout.allocate());
        let context = ApplicationContext::new(
            image.name.clone(),
            inner.controller.clone(),
            inner.shutdown.clone(),
        );
        let written = Accessor::<ApplicationContext>::new(
            image.context_slot,
            Key::of::<ApplicationContext>(),
        )
        .store(&arena, Svc::new(context))
        .and_then(|()| {
            let evaluator = Evaluator::new(image, &arena, &[]);
            image
                .write_order
                .iter()
                .try_for_each(|&writer| evaluator.write(writer))
        });

        if let Err(cause) = written {
            error!("application {} failed to initialize: {cause}", self.name());
            return Err(inner.controller.fail(cause));
        }

        *inner.arena.write() = Some(arena);
        inner.controller.transition(
            "initialize",
            LifetimeState::Initializing,
            LifetimeState::Initialized,
        )?;
        debug!("application {} initialized", self.name());
        Ok(())
    }

    /// Runs the start hooks and the entry point, then starts the daemons and
    /// scheduled operations.
    ///
    /// If any of them fails, the started tasks are stopped, the arena is
    /// discarded and the application is terminated.
    pub fn start(&self) -> Result<(), LifetimeError> {
        let inner = &self.inner;
        inner.controller.transition(
            "start",
            LifetimeState::Initialized,
            LifetimeState::Starting,
        )?;
        debug!("starting application {}", self.name());

        if let Err(cause) = self.run_start_operations() {
            return Err(self.abort(cause));
        }
        inner.controller.transition(
            "start",
            LifetimeState::Starting,
            LifetimeState::Running,
        )?;

        if inner.controller.take_stop_request() {
            debug!("application {} was stopped while starting", self.name());
            return self.stop();
        }
        if let Err(cause) = self.start_tasks() {
            return Err(self.abort(cause));
        }
        info!("application {} is running", self.name());
        Ok(())
    }

    fn run_start_operations(&self) -> InjectResult<()> {
        let image = &self.inner.image;
        let arena = self.live_arena()?;
        let evaluator = Evaluator::new(image, &arena, &[]);
        for &hook in &image.start_hooks {
            evaluator.invoke(hook)?;
        }
        if let Some(entry_point) = image.entry_point {
            let result = evaluator.invoke(entry_point)?;
            arena.replace(image.entry_slot, result)?;
        }
        Ok(())
    }

    fn start_tasks(&self) -> InjectResult<()> {
        let image = &self.inner.image;
        let mut tasks = self.inner.tasks.lock();
        // stop() raises the signal before taking the tasks
        if self.inner.shutdown.is_shutdown() {
            debug!("application {} stopped before its tasks started", self.name());
            return Ok(());
        }
        let arena = self.live_arena()?;
        let manager = tasks.get_or_insert_with(TaskManager::default);
        for &node in &image.tasks {
            let Some(compiled) = image.nodes.get(node.index()) else {
                continue;
            };
            let (name, kind) = match &compiled.kind {
                OperationKind::Daemon(config) => {
                    (config.name.clone(), TaskKind::Daemon(config.clone()))
                }
                OperationKind::Scheduled(config) => {
                    (config.name.clone(), TaskKind::Scheduled(config.clone()))
                }
                _ => continue,
            };

            let run: TaskInvoker = {
                let image = image.clone();
                let arena = arena.clone();
                Svc::new(move |operation: &[(Key, DynSvc)]| {
                    Evaluator::new(&image, &arena, operation)
                        .invoke(node)
                        .map(|_| ())
                })
            };
            manager.spawn(
                TaskSpec {
                    name: name.unwrap_or_else(|| compiled.site.to_string()),
                    kind,
                    run,
                },
                &image.config,
                &self.inner.shutdown,
            )?;
        }
        debug!(
            "application {} started {} tasks",
            self.name(),
            manager.len()
        );
        Ok(())
    }

    /// Terminates an application that failed to start.
    fn abort(&self, cause: InjectError) -> LifetimeError {
        error!("application {} failed to start: {cause}", self.name());
        let failure = self.inner.controller.fail(cause);
        self.inner.shutdown.signal();
        let tasks = self.inner.tasks.lock().take();
        if let Some(tasks) = tasks {
            tasks.stop();
        }
        self.inner.arena.write().take();
        failure
    }

    /// Stops the application: raises the shutdown signal, stops every task,
    /// then runs the stop hooks in reverse declaration order.
    ///
    /// Stopping an application that is still starting takes effect once it
    /// runs. Stopping a stopped application does nothing.
    pub fn stop(&self) -> Result<(), LifetimeError> {
        let inner = &self.inner;
        match inner.controller.begin_stop()? {
            StopAction::Done | StopAction::Deferred => return Ok(()),
            StopAction::Idle => {
                inner.shutdown.signal();
            }
            StopAction::Stop => {
                debug!("stopping application {}", self.name());
                inner.shutdown.signal();
                let tasks = inner.tasks.lock().take();
                if let Some(tasks) = tasks {
                    tasks.stop();
                }
                self.run_stop_hooks();
            }
        }

        inner.controller.transition(
            "stop",
            LifetimeState::Shutdown,
            LifetimeState::Terminated,
        )?;
        info!("application {} terminated", self.name());
        Ok(())
    }

    fn run_stop_hooks(&self) {
        let image = &self.inner.image;
        let Some(arena) = self.arena() else {
            return;
        };
        let evaluator = Evaluator::new(image, &arena, &[]);
        for &hook in image.stop_hooks.iter().rev() {
            if let Err(error) = evaluator.invoke(hook) {
                error!(
                    "stop hook of application {} failed: {error}",
                    self.name()
                );
            }
        }
    }

    /// Gets a service of the root container or the shared namespace.
    pub fn get<T: Service>(&self) -> InjectResult<Svc<T>> {
        self.get_in(ContainerId(0), Key::of::<T>())
    }

    /// Gets the service registered under `key` in the root container or the
    /// shared namespace.
    pub fn get_key<T: Service>(&self, key: Key) -> InjectResult<Svc<T>> {
        self.get_in(ContainerId(0), key)
    }

    /// Gets the service registered under `key` in `container` or the shared
    /// namespace. Prototypes are created anew on every call.
    pub fn get_in<T: Service>(
        &self,
        container: ContainerId,
        key: Key,
    ) -> InjectResult<Svc<T>> {
        let image = &self.inner.image;
        let arena = self.live_arena()?;
        let (_, binding) = image
            .binding(container, &key)
            .ok_or(InjectError::MissingService { key })?;

        Evaluator::new(image, &arena, &[])
            .require(binding, key)?
            .downcast_arc::<T>()
            .map_err(|_| InjectError::TypeMismatch {
                key,
                expected: ServiceInfo::of::<T>(),
            })
    }

    /// The value returned by the entry point, once the application started.
    /// `None` when the entry point returned nothing.
    pub fn entry_result<T: Service>(&self) -> InjectResult<Option<Svc<T>>> {
        let arena = self.live_arena()?;
        let slot = self.inner.image.entry_slot;
        if !arena.is_written(slot) {
            return Ok(None);
        }
        let key = Key::of::<T>();
        arena
            .read(slot)?
            .downcast_arc::<T>()
            .map(Some)
            .map_err(|_| InjectError::TypeMismatch {
                key,
                expected: ServiceInfo::of::<T>(),
            })
    }
}
