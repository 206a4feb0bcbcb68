mod arguments;
mod descriptor;
mod inject;

pub use arguments::*;
pub use descriptor::*;
pub use inject::*;
