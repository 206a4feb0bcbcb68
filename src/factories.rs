mod factory;
mod fallible;
mod member;
mod output;

pub use factory::*;
pub use fallible::*;
pub use member::*;
pub use output::*;
