use crate::{BoxError, DynSvc, Service, Svc};

/// The value returned by a lifecycle hook, entry point or task. Returning an
/// `Err` fails the operation.
pub trait OperationOutput: 'static {
    /// Converts the returned value into an optional service.
    fn into_output(self) -> Result<Option<DynSvc>, BoxError>;
}

impl OperationOutput for () {
    fn into_output(self) -> Result<Option<DynSvc>, BoxError> {
        Ok(None)
    }
}

impl<T, E> OperationOutput for Result<T, E>
where
    T: Service,
    E: Into<BoxError> + 'static,
{
    fn into_output(self) -> Result<Option<DynSvc>, BoxError> {
        match self {
            Ok(value) => Ok(Some(Svc::new(value))),
            Err(error) => Err(error.into()),
        }
    }
}
