mod key;
mod provider;
mod registry;
mod service;

pub use key::*;
pub use provider::*;
pub(crate) use registry::*;
pub use service::*;
