use crate::{
    Assembly, BeanDefinition, BeanId, ConstantProvider, ContainerId,
    ExtensionId, Home, Key, NamespaceId, ProviderLocation, Realm, Service,
    ServiceProvider,
};
use std::panic::Location;

/// A pluggable module that contributes beans and services to the containers
/// that use it.
///
/// Every extension type owns one namespace per assembly. The namespace is
/// set up once, by the first [`Assembly::use_extension`] call for the type.
/// Every container using the extension is then attached to it and may
/// receive services exported from the namespace.
///
/// ```
/// use bean_injector::{
///     constant, Application, ContainerSetup, Extension, NamespaceSetup, Svc,
/// };
///
/// struct Clock(u64);
///
/// struct ClockExtension;
///
/// impl Extension for ClockExtension {
///     fn configure(&self, namespace: &mut NamespaceSetup<'_>) {
///         namespace.provide(constant(Clock(42)));
///     }
///
///     fn attach(&self, container: &mut ContainerSetup<'_>) {
///         container.export::<Clock>();
///     }
/// }
///
/// let mut assembly = Application::builder("clocks");
/// let root = assembly.root();
/// assembly.use_extension(root, ClockExtension);
///
/// let application = assembly.build().unwrap().launch().unwrap();
/// let clock: Svc<Clock> = application.get().unwrap();
/// assert_eq!(42, clock.0);
/// ```
pub trait Extension: Service {
    /// Installs the beans and services of the extension's namespace.
    fn configure(&self, _namespace: &mut NamespaceSetup<'_>) {}

    /// Attaches the extension to a container that uses it.
    fn attach(&self, _container: &mut ContainerSetup<'_>) {}
}

/// Configures the namespace of an extension.
pub struct NamespaceSetup<'a> {
    pub(crate) assembly: &'a mut Assembly,
    pub(crate) extension: ExtensionId,
    pub(crate) namespace: NamespaceId,
}

impl NamespaceSetup<'_> {
    /// The extension being configured.
    #[must_use]
    pub fn extension(&self) -> ExtensionId {
        self.extension
    }

    /// The namespace being configured.
    #[must_use]
    pub fn namespace(&self) -> NamespaceId {
        self.namespace
    }

    /// Installs a bean into the namespace.
    #[track_caller]
    pub fn install<T: Service>(&mut self, bean: BeanDefinition<T>) -> BeanId {
        self.assembly.install_bean(
            Home::Namespace(self.namespace),
            Realm::Extension(self.extension),
            bean,
            Location::caller(),
        )
    }

    /// Registers a constant in the namespace.
    #[track_caller]
    pub fn provide<T: Service>(&mut self, constant: ConstantProvider<T>) {
        self.assembly.provide_constant(
            Home::Namespace(self.namespace),
            constant,
            Location::caller(),
        );
    }
}

/// Attaches an extension to one of the containers using it.
pub struct ContainerSetup<'a> {
    pub(crate) assembly: &'a mut Assembly,
    pub(crate) extension: ExtensionId,
    pub(crate) namespace: NamespaceId,
    pub(crate) container: ContainerId,
}

impl ContainerSetup<'_> {
    /// The extension being attached.
    #[must_use]
    pub fn extension(&self) -> ExtensionId {
        self.extension
    }

    /// The container the extension is attached to.
    #[must_use]
    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// Installs a bean owned by the extension into the container. The bean
    /// resolves its namespace dependencies in the extension's namespace.
    #[track_caller]
    pub fn install<T: Service>(&mut self, bean: BeanDefinition<T>) -> BeanId {
        self.assembly.install_bean(
            Home::Container(self.container),
            Realm::Extension(self.extension),
            bean,
            Location::caller(),
        )
    }

    /// Registers a constant in the container.
    #[track_caller]
    pub fn provide<T: Service>(&mut self, constant: ConstantProvider<T>) {
        self.assembly.provide_constant(
            Home::Container(self.container),
            constant,
            Location::caller(),
        );
    }

    /// Makes a service of the extension's namespace available in the
    /// container.
    #[track_caller]
    pub fn export<T: Service>(&mut self) {
        self.export_key(Key::of::<T>());
    }

    /// Makes the service registered under `key` in the extension's namespace
    /// available in the container.
    #[track_caller]
    pub fn export_key(&mut self, key: Key) {
        self.assembly.register(
            Home::Container(self.container),
            key,
            ServiceProvider::Delegating(ProviderLocation::Namespace(self.namespace)),
            Location::caller(),
        );
    }
}
