use crate::{
    Arguments, DaemonConfig, Dependency, DynSvc, InjectError, InjectResult,
    Key, MemberFactory, MemberSite, OperationOutput, ScheduleConfig, Service,
    Svc,
};
use std::panic::Location;

/// An erased operation: the owning bean (when the operation is a member) and
/// the bound arguments go in, an optional service comes out.
pub(crate) type Invoker = Svc<
    dyn Fn(Option<&DynSvc>, &mut Arguments) -> InjectResult<Option<DynSvc>>
        + Send
        + Sync,
>;

#[derive(Clone, Debug)]
pub(crate) enum OperationKind {
    Constructor,
    Provides { key: Key, constant: bool },
    InjectField,
    OnStart,
    OnStop,
    EntryPoint,
    Daemon(DaemonConfig),
    Scheduled(ScheduleConfig),
}

impl OperationKind {
    pub fn describe(&self) -> &'static str {
        match self {
            OperationKind::Constructor => "constructor",
            OperationKind::Provides { constant: true, .. } => "provider",
            OperationKind::Provides { constant: false, .. } => {
                "prototype provider"
            }
            OperationKind::InjectField => "field injector",
            OperationKind::OnStart => "start hook",
            OperationKind::OnStop => "stop hook",
            OperationKind::EntryPoint => "entry point",
            OperationKind::Daemon(_) => "daemon",
            OperationKind::Scheduled(_) => "scheduled operation",
        }
    }
}

/// One discovered operation of a bean, ready to become a dependency node.
#[derive(Clone)]
pub(crate) struct OperationDefinition {
    pub kind: OperationKind,
    pub site: MemberSite,
    pub dependencies: Vec<Dependency>,
    pub invoker: Invoker,
    pub receiver: bool,
    pub declared_at: &'static Location<'static>,
}

impl OperationDefinition {
    /// Erases a member factory, converting its output with `convert`.
    pub fn member<T, D, F, C>(
        kind: OperationKind,
        site: MemberSite,
        factory: F,
        convert: C,
        declared_at: &'static Location<'static>,
    ) -> Self
    where
        T: Service,
        D: 'static,
        F: MemberFactory<T, D>,
        C: Fn(F::Output) -> InjectResult<Option<DynSvc>>
            + Send
            + Sync
            + 'static,
    {
        let dependencies = factory.dependencies();
        let owner_site = site.to_string();
        let invoker: Invoker = Svc::new(
            move |receiver: Option<&DynSvc>, arguments: &mut Arguments| {
                let owner = receiver
                    .and_then(|receiver| receiver.downcast_ref::<T>())
                    .ok_or_else(|| {
                        InjectError::InternalError(format!(
                            "{owner_site} was invoked without its bean"
                        ))
                    })?;
                convert(factory.invoke(owner, arguments)?)
            },
        );

        OperationDefinition {
            kind,
            site,
            dependencies,
            invoker,
            receiver: true,
            declared_at,
        }
    }
}

/// Converts the output of a producing member.
pub(crate) fn produced<R: Service>(output: R) -> InjectResult<Option<DynSvc>> {
    Ok(Some(Svc::new(output)))
}

/// Converts the output of a hook or task, naming the member on failure.
pub(crate) fn completed<O: OperationOutput>(
    site: String,
) -> impl Fn(O) -> InjectResult<Option<DynSvc>> + Send + Sync + 'static {
    move |output| {
        output
            .into_output()
            .map_err(|inner| InjectError::ActivationFailed {
                site: site.clone(),
                inner,
            })
    }
}
