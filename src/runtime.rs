mod application;
mod context;
mod evaluate;
mod image;
mod lifetime;

pub use application::*;
pub use context::*;
pub(crate) use evaluate::*;
pub use image::*;
pub use lifetime::*;
