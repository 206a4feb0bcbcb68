use crate::{
    Arguments, Dependency, InjectError, InjectResult, Service, ServiceFactory,
    ServiceInfo,
};
use std::{error::Error, marker::PhantomData};

/// A service factory that may fail during service creation with a custom error
/// type. During activation failure, an instance of
/// [`InjectError::ActivationFailed`] is returned as an error.
pub struct FallibleServiceFactory<D, R, E, F>
where
    R: Service,
    E: Error + Send + Sync + 'static,
    F: ServiceFactory<D, Result = Result<R, E>>,
{
    inner: F,
    marker: PhantomData<fn(D) -> Result<R, E>>,
}

impl<D, R, E, F> ServiceFactory<D> for FallibleServiceFactory<D, R, E, F>
where
    D: 'static,
    R: Service,
    E: Error + Send + Sync + 'static,
    F: ServiceFactory<D, Result = Result<R, E>>,
{
    type Result = R;

    fn dependencies(&self) -> Vec<Dependency> {
        self.inner.dependencies()
    }

    fn function_name(&self) -> &'static str {
        self.inner.function_name()
    }

    fn invoke(
        &self,
        arguments: &mut Arguments,
    ) -> InjectResult<Option<Self::Result>> {
        match self.inner.invoke(arguments)? {
            Some(Ok(result)) => Ok(Some(result)),
            Some(Err(error)) => Err(InjectError::ActivationFailed {
                site: ServiceInfo::of::<R>().to_string(),
                inner: Box::new(error),
            }),
            None => Ok(None),
        }
    }
}

/// Defines a conversion into a fallible service factory. This trait is
/// automatically implemented for all service factories that return a
/// [`Result<T, E>`] with a type that implements [`Error`].
pub trait IntoFallible<D, R, E, F>
where
    R: Service,
    E: Error + Send + Sync + 'static,
    F: ServiceFactory<D, Result = Result<R, E>>,
{
    /// # Example
    ///
    /// ```
    /// use bean_injector::{
    ///     Application, BuildError, IntoFallible, IntoSingleton, LifetimeError,
    /// };
    /// use std::fmt::{Display, Formatter};
    ///
    /// #[derive(Debug)]
    /// struct PortInUse;
    ///
    /// impl std::error::Error for PortInUse {}
    /// impl Display for PortInUse {
    ///     fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    ///         write!(f, "the port is already in use")
    ///     }
    /// }
    ///
    /// struct Listener;
    ///
    /// fn bind() -> Result<Listener, PortInUse> {
    ///     Err(PortInUse)
    /// }
    ///
    /// let mut assembly = Application::builder("server");
    /// assembly.install(bind.fallible().singleton());
    ///
    /// let image = assembly.build().unwrap();
    /// match image.launch() {
    ///     Err(LifetimeError::LaunchFailed { .. }) => {}
    ///     _ => unreachable!("the listener should have failed to bind"),
    /// }
    /// ```
    #[must_use]
    fn fallible(self) -> FallibleServiceFactory<D, R, E, F>;
}

impl<D, R, E, F> IntoFallible<D, R, E, F> for F
where
    R: Service,
    E: Error + Send + Sync + 'static,
    F: ServiceFactory<D, Result = Result<R, E>>,
{
    fn fallible(self) -> FallibleServiceFactory<D, R, E, F> {
        FallibleServiceFactory {
            inner: self,
            marker: PhantomData,
        }
    }
}

/// A service factory that may produce no value. A nullable factory bound to
/// a singleton that returns `None` fails the launch with
/// [`InjectError::NullConstant`].
pub struct NullableServiceFactory<D, R, F>
where
    R: Service,
    F: ServiceFactory<D, Result = Option<R>>,
{
    inner: F,
    marker: PhantomData<fn(D) -> Option<R>>,
}

impl<D, R, F> ServiceFactory<D> for NullableServiceFactory<D, R, F>
where
    D: 'static,
    R: Service,
    F: ServiceFactory<D, Result = Option<R>>,
{
    type Result = R;

    fn dependencies(&self) -> Vec<Dependency> {
        self.inner.dependencies()
    }

    fn function_name(&self) -> &'static str {
        self.inner.function_name()
    }

    fn invoke(
        &self,
        arguments: &mut Arguments,
    ) -> InjectResult<Option<Self::Result>> {
        Ok(self.inner.invoke(arguments)?.flatten())
    }
}

/// Defines a conversion into a nullable service factory. This trait is
/// automatically implemented for all service factories that return an
/// [`Option<T>`].
pub trait IntoNullable<D, R, F>
where
    R: Service,
    F: ServiceFactory<D, Result = Option<R>>,
{
    /// Treats a returned `None` as "no value" rather than as a service of
    /// type `Option<R>`.
    #[must_use]
    fn nullable(self) -> NullableServiceFactory<D, R, F>;
}

impl<D, R, F> IntoNullable<D, R, F> for F
where
    R: Service,
    F: ServiceFactory<D, Result = Option<R>>,
{
    fn nullable(self) -> NullableServiceFactory<D, R, F> {
        NullableServiceFactory {
            inner: self,
            marker: PhantomData,
        }
    }
}
