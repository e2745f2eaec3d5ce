//! snap-blade: Blade-style directives for theme templates
//!
//! Templates are minijinja templates (`{{ }}` echoes, `{% %}` statements)
//! extended with `@directives`. Directives are text expanders registered by
//! name; the compiler replaces each one with template code before
//! minijinja compiles it, so a malformed directive fails before anything is
//! rendered.
//!
//! At render time the expanded code drives a per-render loop stack (the
//! `blade_loop` variable), resolves partial data through a
//! [`ViewDataResolver`](view::ViewDataResolver) and asks a
//! [`ThemeHost`](host::ThemeHost) for everything site specific.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use snap_blade::prelude::*;
//!
//! # fn main() -> snap_blade::error::Result<()> {
//! let loader = MemoryLoader::new()
//!     .with("views.index", "<ul>@loop($posts as $post)@partial('item', {'n': blade_loop.iteration})@endloop</ul>")
//!     .with("partials.item", "<li>{{ n }}. {{ post }}</li>");
//!
//! let engine = BladeEngine::builder().loader(Arc::new(loader)).build();
//!
//! let mut data = ViewData::new();
//! data.insert("posts".into(), json!(["Hello", "World"]));
//! let html = engine.render("views.index", &data)?;
//! assert_eq!(html, "<ul><li>1. Hello</li><li>2. World</li></ul>");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`compiler`]: directive scanning, pairing checks and expansion
//! - [`directive`]: the directive registry and the built-in set
//! - [`runtime`]: loop stack, render context and the functions expanded
//!   directives call
//! - [`view`]: default data providers and merging
//! - [`engine`]: the minijinja environment, loading and rendering

pub mod compiler;
pub mod config;
pub mod directive;
pub mod engine;
pub mod error;
pub mod host;
pub mod observability;
pub mod runtime;
pub mod template;
pub mod view;

#[cfg(test)]
pub mod testing;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! ```rust
    //! use snap_blade::prelude::*;
    //! ```

    pub use crate::config::SnapConfig;
    pub use crate::directive::{Directive, DirectiveRegistry};
    pub use crate::engine::{BladeEngine, BladeEngineBuilder};
    pub use crate::error::{BladeError, CompileError, Result};
    pub use crate::host::{NullHost, ThemeHost};
    pub use crate::runtime::{LoopMetadata, RenderContext};
    pub use crate::template::{FileSystemLoader, MemoryLoader, TemplateLoader};
    pub use crate::view::{DefaultsProvider, ViewComposers, ViewData, ViewDataResolver};
}
