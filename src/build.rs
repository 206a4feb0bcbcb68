mod assembly;
mod context;
mod error;
mod extension;
mod ids;
mod link;
mod node;
mod order;
mod requirement;
mod resolve;
mod scope;

pub use assembly::*;
pub use context::*;
pub use error::*;
pub use extension::*;
pub use ids::*;
pub(crate) use link::*;
pub(crate) use node::*;
pub(crate) use order::*;
pub(crate) use requirement::*;
pub(crate) use resolve::*;
pub use scope::*;
