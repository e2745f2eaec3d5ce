//! Template sources and name handling

pub mod helpers;
pub mod loader;

pub use loader::{FileSystemLoader, MemoryLoader, TemplateLoader};
