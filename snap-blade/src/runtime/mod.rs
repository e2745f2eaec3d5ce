//! Render-time machinery
//!
//! - [`LoopStack`]: nested iteration state behind `blade_loop`
//! - [`RenderContext`]: one root render with its child renders
//! - the `__` functions expanded directives call into

mod context;
pub(crate) mod functions;
pub mod loop_stack;
pub mod value;

pub use context::{RenderContext, MAX_RENDER_DEPTH};
pub(crate) use context::{render_root, RenderSession};
pub use loop_stack::{Checkpoint, LoopFrame, LoopKind, LoopMetadata, LoopStack, LoopStackError};
