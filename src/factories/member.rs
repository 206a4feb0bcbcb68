use crate::{Arguments, Dependency, Inject, InjectResult, Service};

/// An operation declared on a bean: a function taking a reference to the
/// bean followed by up to 11 injected parameters. Producing members, field
/// injectors, lifecycle hooks and tasks are all member factories.
///
/// ```
/// use bean_injector::{MemberFactory, Svc};
///
/// struct Pool;
/// struct Server;
///
/// impl Server {
///     fn connections(&self, pool: Svc<Pool>, limit: Option<Svc<u32>>) -> usize {
///         limit.map_or(8, |limit| *limit as usize)
///     }
/// }
///
/// fn dependencies<F: MemberFactory<Server, D>, D>(f: &F) -> usize {
///     f.dependencies().len()
/// }
///
/// assert_eq!(2, dependencies(&Server::connections));
/// ```
pub trait MemberFactory<O: Service, D>: Send + Sync + 'static {
    /// The value returned by the member.
    type Output: 'static;

    /// The dependencies of this member, in parameter order. The owner is not
    /// included.
    fn dependencies(&self) -> Vec<Dependency>;

    /// Invokes the member on `owner`.
    fn invoke(
        &self,
        owner: &O,
        arguments: &mut Arguments,
    ) -> InjectResult<Self::Output>;
}

macro_rules! impl_member_function {
    () => {
        impl_member_function!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_member_function!(@impl ($first $(, $rest)*));
        impl_member_function!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl<F, O, R $(, $type_name)*> MemberFactory<O, ($($type_name,)*)> for F
        where
            F: Fn(&O $(, $type_name)*) -> R + Send + Sync + 'static,
            O: Service,
            R: 'static,
            $($type_name: Inject,)*
        {
            type Output = R;

            fn dependencies(&self) -> Vec<Dependency> {
                vec![$(<$type_name as Inject>::dependency()),*]
            }

            #[allow(unused_variables, non_snake_case)]
            fn invoke(
                &self,
                owner: &O,
                arguments: &mut Arguments,
            ) -> InjectResult<Self::Output> {
                $(let $type_name = arguments.take::<$type_name>()?;)*
                Ok(self(owner $(, $type_name)*))
            }
        }
    };
}

impl_member_function!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
