use crate::{Argument, Inject, InjectError, InjectResult};
use std::vec;

/// The values bound to the dependencies of one invocation, in parameter
/// order. Factories take their parameters from the front.
#[derive(Debug)]
pub struct Arguments {
    values: vec::IntoIter<Argument>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<Argument>) -> Self {
        Arguments {
            values: values.into_iter(),
        }
    }

    /// Takes the next argument as a parameter of type `T`.
    pub fn take<T: Inject>(&mut self) -> InjectResult<T> {
        let argument = self.values.next().ok_or_else(|| {
            InjectError::InternalError(format!(
                "no argument was bound for a parameter of type {}",
                std::any::type_name::<T>()
            ))
        })?;
        T::extract(argument)
    }

    /// The number of arguments that have not been taken yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}
