//! CLI command implementations

mod check;
mod render;

pub use check::{CheckCommand, CheckReport};
pub use render::{CompileCommand, RenderCommand};
