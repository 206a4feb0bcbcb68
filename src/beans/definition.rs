use crate::{
    beans::{completed, produced, OperationDefinition, OperationKind},
    Arguments, ConstantProvider, DaemonConfig, DynSvc, Key, MemberFactory,
    MemberSite, OperationOutput, Qualifier, ResolutionOrder, ScheduleConfig,
    Service, ServiceFactory, ServiceInfo, SiteKind, Svc,
};
use derive_more::Display;
use std::{borrow::Cow, marker::PhantomData, panic::Location};

/// How many instances of a bean exist per application.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum BeanLifetime {
    /// One instance, created while the application initializes and stored in
    /// its arena.
    #[display(fmt = "singleton")]
    Singleton,
    /// A new instance for every request.
    #[display(fmt = "prototype")]
    Prototype,
}

/// A constant that is only visible to the operations of one bean.
pub(crate) struct LocalConstant {
    pub key: Key,
    pub value: DynSvc,
    pub declared_at: &'static Location<'static>,
}

/// Describes a bean: how to construct it and which operations it declares.
/// Created from a constructor with [`IntoSingleton::singleton`] or
/// [`IntoPrototype::prototype`].
///
/// ```
/// use bean_injector::{Application, IntoSingleton, Svc};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Pool {
///     open: AtomicBool,
/// }
///
/// impl Pool {
///     fn open(&self) {
///         self.open.store(true, Ordering::SeqCst);
///     }
///
///     fn close(&self) {
///         self.open.store(false, Ordering::SeqCst);
///     }
/// }
///
/// let mut assembly = Application::builder("pool");
/// assembly.install(
///     Pool::default
///         .singleton()
///         .on_start(Pool::open)
///         .on_stop(Pool::close),
/// );
///
/// let application = assembly.build().unwrap().new_application();
/// application.initialize().unwrap();
/// application.start().unwrap();
///
/// let pool: Svc<Pool> = application.get().unwrap();
/// assert!(pool.open.load(Ordering::SeqCst));
///
/// application.stop().unwrap();
/// assert!(!pool.open.load(Ordering::SeqCst));
/// ```
pub struct BeanDefinition<T: Service> {
    pub(crate) key: Key,
    pub(crate) lifetime: BeanLifetime,
    pub(crate) constructor: OperationDefinition,
    pub(crate) members: Vec<OperationDefinition>,
    pub(crate) locals: Vec<LocalConstant>,
    pub(crate) search: ResolutionOrder,
    marker: PhantomData<fn() -> T>,
}

impl<T: Service> BeanDefinition<T> {
    #[track_caller]
    fn new<D, F>(factory: F, lifetime: BeanLifetime) -> Self
    where
        D: 'static,
        F: ServiceFactory<D, Result = T>,
    {
        let site = MemberSite::named_after(
            ServiceInfo::of::<T>(),
            factory.function_name(),
            SiteKind::Constructor,
        );
        let dependencies = factory.dependencies();
        let constructor = OperationDefinition {
            kind: OperationKind::Constructor,
            site,
            dependencies,
            invoker: Svc::new(
                move |_: Option<&DynSvc>, arguments: &mut Arguments| {
                    Ok(factory
                        .invoke(arguments)?
                        .map(|instance| -> DynSvc { Svc::new(instance) }))
                },
            ),
            receiver: false,
            declared_at: Location::caller(),
        };

        BeanDefinition {
            key: Key::of::<T>(),
            lifetime,
            constructor,
            members: Vec::new(),
            locals: Vec::new(),
            search: ResolutionOrder::default(),
            marker: PhantomData,
        }
    }

    /// The key the bean instance is registered under.
    #[must_use]
    pub fn key(&self) -> Key {
        self.key
    }

    /// The lifetime of the bean.
    #[must_use]
    pub fn lifetime(&self) -> BeanLifetime {
        self.lifetime
    }

    /// Registers the bean instance under the qualifier `Q`.
    #[must_use]
    pub fn qualified<Q: Qualifier>(mut self) -> Self {
        self.key = self.key.with_qualifier::<Q>();
        self
    }

    /// Declares a member that produces a constant service. The member is
    /// invoked once, after the bean itself was created, and its result is
    /// stored in the arena.
    #[must_use]
    #[track_caller]
    pub fn provides<D, F>(self, member: F) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: Service,
    {
        let key = Key::of::<F::Output>();
        self.producing(key, true, member)
    }

    /// Declares a member that produces a constant service registered under
    /// the qualifier `Q`.
    #[must_use]
    #[track_caller]
    pub fn provides_qualified<Q, D, F>(self, member: F) -> Self
    where
        Q: Qualifier,
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: Service,
    {
        let key = Key::qualified::<F::Output, Q>();
        self.producing(key, true, member)
    }

    /// Declares a member that produces a new service for every request.
    #[must_use]
    #[track_caller]
    pub fn provides_prototype<D, F>(self, member: F) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: Service,
    {
        let key = Key::of::<F::Output>();
        self.producing(key, false, member)
    }

    #[track_caller]
    fn producing<D, F>(mut self, key: Key, constant: bool, member: F) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: Service,
    {
        let site = MemberSite::of_function::<F>(
            ServiceInfo::of::<T>(),
            SiteKind::Method,
        );
        self.members.push(OperationDefinition::member(
            OperationKind::Provides { key, constant },
            site,
            member,
            produced::<F::Output>,
            Location::caller(),
        ));
        self
    }

    /// Declares an injected field. The injector is invoked once, after the
    /// bean was created and before any other bean observes it. The bean
    /// stores the injected values through interior mutability.
    #[must_use]
    #[track_caller]
    pub fn inject_field<D, F>(
        self,
        field: impl Into<Cow<'static, str>>,
        injector: F,
    ) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: OperationOutput,
    {
        let site =
            MemberSite::new(ServiceInfo::of::<T>(), field, SiteKind::Field);
        self.operation(OperationKind::InjectField, site, injector)
    }

    /// Declares a hook invoked when the application starts.
    #[must_use]
    #[track_caller]
    pub fn on_start<D, F>(self, hook: F) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: OperationOutput,
    {
        self.method(OperationKind::OnStart, hook)
    }

    /// Declares a hook invoked when the application stops. Stop hooks run in
    /// the reverse order of their declaration.
    #[must_use]
    #[track_caller]
    pub fn on_stop<D, F>(self, hook: F) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: OperationOutput,
    {
        self.method(OperationKind::OnStop, hook)
    }

    /// Declares the entry point of the application. An application has at
    /// most one entry point; it runs on the thread that starts the
    /// application, and its result can be read with
    /// [`Application::entry_result`](crate::Application::entry_result).
    #[must_use]
    #[track_caller]
    pub fn entry_point<D, F>(self, entry_point: F) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: OperationOutput,
    {
        self.method(OperationKind::EntryPoint, entry_point)
    }

    /// Declares a daemon: an operation invoked in a loop on its own thread
    /// until the application stops. The operation can request a
    /// [`DaemonContext`](crate::DaemonContext) to observe the shutdown.
    #[must_use]
    #[track_caller]
    pub fn daemon<D, F>(self, daemon: F) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: OperationOutput,
    {
        self.method(OperationKind::Daemon(DaemonConfig::new()), daemon)
    }

    /// Declares a daemon with a custom configuration.
    #[must_use]
    #[track_caller]
    pub fn daemon_with<D, F>(self, config: DaemonConfig, daemon: F) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: OperationOutput,
    {
        self.method(OperationKind::Daemon(config), daemon)
    }

    /// Declares an operation invoked periodically while the application
    /// runs. The operation can request a
    /// [`ScheduledContext`](crate::ScheduledContext).
    #[must_use]
    #[track_caller]
    pub fn scheduled<D, F>(self, config: ScheduleConfig, operation: F) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: OperationOutput,
    {
        self.method(OperationKind::Scheduled(config), operation)
    }

    /// Binds a constant that only the operations of this bean can see.
    #[must_use]
    #[track_caller]
    pub fn bind_local<C: Service>(
        mut self,
        constant: ConstantProvider<C>,
    ) -> Self {
        let (key, value) = constant.into_parts();
        self.locals.push(LocalConstant {
            key,
            value,
            declared_at: Location::caller(),
        });
        self
    }

    /// Changes the scopes searched for the dependencies of this bean, and
    /// their order.
    #[must_use]
    pub fn search(mut self, order: ResolutionOrder) -> Self {
        self.search = order;
        self
    }

    #[track_caller]
    fn method<D, F>(self, kind: OperationKind, member: F) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: OperationOutput,
    {
        let site =
            MemberSite::of_function::<F>(ServiceInfo::of::<T>(), SiteKind::Method);
        self.operation(kind, site, member)
    }

    #[track_caller]
    fn operation<D, F>(
        mut self,
        kind: OperationKind,
        site: MemberSite,
        member: F,
    ) -> Self
    where
        D: 'static,
        F: MemberFactory<T, D>,
        F::Output: OperationOutput,
    {
        let convert = completed::<F::Output>(site.to_string());
        self.members.push(OperationDefinition::member(
            kind,
            site,
            member,
            convert,
            Location::caller(),
        ));
        self
    }
}

/// Defines a conversion into a singleton bean. This trait is automatically
/// implemented for all service factories.
pub trait IntoSingleton<D, R, F>
where
    R: Service,
    F: ServiceFactory<D, Result = R>,
{
    /// Creates a singleton bean. The bean is constructed once while the
    /// application initializes, after every bean it depends on.
    ///
    /// # Example
    ///
    /// ```
    /// use bean_injector::{Application, IntoSingleton, Svc};
    ///
    /// #[derive(Default)]
    /// struct Foo;
    ///
    /// let mut assembly = Application::builder("example");
    /// assembly.install(Foo::default.singleton());
    ///
    /// let application = assembly.build().unwrap().launch().unwrap();
    /// let foo1: Svc<Foo> = application.get().unwrap();
    /// let foo2: Svc<Foo> = application.get().unwrap();
    ///
    /// assert!(Svc::ptr_eq(&foo1, &foo2));
    /// ```
    #[must_use]
    fn singleton(self) -> BeanDefinition<R>;
}

impl<D, R, F> IntoSingleton<D, R, F> for F
where
    D: 'static,
    R: Service,
    F: ServiceFactory<D, Result = R>,
{
    #[track_caller]
    fn singleton(self) -> BeanDefinition<R> {
        BeanDefinition::new(self, BeanLifetime::Singleton)
    }
}

/// Defines a conversion into a prototype bean. This trait is automatically
/// implemented for all service factories.
pub trait IntoPrototype<D, R, F>
where
    R: Service,
    F: ServiceFactory<D, Result = R>,
{
    /// Creates a prototype bean. A new instance is constructed every time
    /// the bean is requested.
    ///
    /// # Example
    ///
    /// ```
    /// use bean_injector::{Application, IntoPrototype, Svc};
    ///
    /// #[derive(Default)]
    /// struct Foo;
    ///
    /// let mut assembly = Application::builder("example");
    /// assembly.install(Foo::default.prototype());
    ///
    /// let application = assembly.build().unwrap().launch().unwrap();
    /// let foo1: Svc<Foo> = application.get().unwrap();
    /// let foo2: Svc<Foo> = application.get().unwrap();
    ///
    /// assert!(!Svc::ptr_eq(&foo1, &foo2));
    /// ```
    #[must_use]
    fn prototype(self) -> BeanDefinition<R>;
}

impl<D, R, F> IntoPrototype<D, R, F> for F
where
    D: 'static,
    R: Service,
    F: ServiceFactory<D, Result = R>,
{
    #[track_caller]
    fn prototype(self) -> BeanDefinition<R> {
        BeanDefinition::new(self, BeanLifetime::Prototype)
    }
}
