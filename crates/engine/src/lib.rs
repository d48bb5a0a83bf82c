mod dsl;
mod eval;
mod gallery;
mod pipeline;
mod tags;

pub use dsl::*;
pub use eval::*;
pub use gallery::*;
pub use pipeline::*;
pub use tags::*;
