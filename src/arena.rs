mod accessor;
mod layout;
mod lifetime_arena;

pub use accessor::*;
pub use layout::*;
pub use lifetime_arena::*;
