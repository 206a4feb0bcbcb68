use crate::{Arguments, Dependency, Inject, InjectResult, Service};

/// A factory for creating instances of a bean. All functions of arity 12 or
/// less are automatically service factories if their parameters implement
/// [`Inject`] and their return value is a valid service type.
///
/// ## Type parameters
/// * `D` - Tuple of this service's dependencies.
///
/// ## Example
///
/// ```
/// use bean_injector::{ServiceFactory, Svc};
///
/// struct Pool;
/// struct Server(Svc<Pool>);
///
/// fn factory(pool: Svc<Pool>) -> Server {
///     Server(pool)
/// }
///
/// assert_eq!(1, factory.dependencies().len());
/// ```
pub trait ServiceFactory<D>: Send + Sync + 'static {
    /// The resulting service from invoking this service factory.
    type Result: Service;

    /// The dependencies of this factory, in parameter order.
    fn dependencies(&self) -> Vec<Dependency>;

    /// Invokes this service factory. `None` means the factory produced no
    /// value.
    fn invoke(
        &self,
        arguments: &mut Arguments,
    ) -> InjectResult<Option<Self::Result>>;

    /// The type name of the function behind this factory, used to name the
    /// constructor in build errors.
    fn function_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

macro_rules! impl_provider_function {
    () => {
        impl_provider_function!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_provider_function!(@impl ($first $(, $rest)*));
        impl_provider_function!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl<F, R $(, $type_name)*> ServiceFactory<($($type_name,)*)> for F
        where
            F: Fn($($type_name),*) -> R + Send + Sync + 'static,
            R: Service,
            $($type_name: Inject,)*
        {
            type Result = R;

            fn dependencies(&self) -> Vec<Dependency> {
                vec![$(<$type_name as Inject>::dependency()),*]
            }

            #[allow(unused_variables, non_snake_case)]
            fn invoke(
                &self,
                arguments: &mut Arguments,
            ) -> InjectResult<Option<Self::Result>> {
                $(let $type_name = arguments.take::<$type_name>()?;)*
                Ok(Some(self($($type_name),*)))
            }
        }
    };
}

impl_provider_function!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
