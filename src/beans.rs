mod constant;
mod definition;
mod operation;

pub use constant::*;
pub use definition::*;
pub(crate) use operation::*;
