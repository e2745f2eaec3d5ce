//! Render and compile commands

use anyhow::{Context, Result};
use snap_blade::prelude::*;

/// Render one template
#[derive(Debug, Clone)]
pub struct RenderCommand {
    /// Template name, or theme file slug with `view`
    pub name: String,
    /// Explicit data for the render
    pub data: ViewData,
    /// Treat `name` as a view slug
    pub view: bool,
}

impl RenderCommand {
    /// Rendered output
    ///
    /// # Errors
    ///
    /// Returns the render error with the template name attached.
    pub fn execute(&self, engine: &BladeEngine) -> Result<String> {
        tracing::debug!(
            name = %self.name,
            view = self.view,
            keys = self.data.len(),
            "rendering"
        );
        let output = if self.view {
            engine.render_view(&self.name, &self.data)
        } else {
            engine.render(&self.name, &self.data)
        };
        output.with_context(|| format!("failed to render {}", self.name))
    }
}

/// Print the template code a template expands to
#[derive(Debug, Clone)]
pub struct CompileCommand {
    /// Template name
    pub name: String,
}

impl CompileCommand {
    /// Expanded source, after checking that it compiles
    ///
    /// # Errors
    ///
    /// Returns the directive or syntax error.
    pub fn execute(&self, engine: &BladeEngine) -> Result<String> {
        tracing::debug!(name = %self.name, "expanding");
        let code = engine
            .expand(&self.name)
            .with_context(|| format!("failed to compile {}", self.name))?;
        engine.compile(&self.name)?;
        Ok(code)
    }
}
