//! Template engine
//!
//! [`BladeEngine`] ties the pieces together: template sources come from a
//! [`TemplateLoader`] and are expanded by the [`DirectiveRegistry`] into
//! minijinja templates, which the environment compiles once and keeps. A
//! render executes them against a [`ThemeHost`] with data from the
//! [`ViewDataResolver`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use snap_blade::engine::BladeEngine;
//! use snap_blade::template::MemoryLoader;
//! use snap_blade::view::ViewData;
//!
//! # fn main() -> snap_blade::error::Result<()> {
//! let loader = MemoryLoader::new()
//!     .with("views.index", "@loop($items as $item){{ blade_loop.index }}:{{ item }} @endloop");
//! let engine = BladeEngine::builder().loader(Arc::new(loader)).build();
//!
//! let mut data = ViewData::new();
//! data.insert("items".into(), json!(["a", "b"]));
//! assert_eq!(engine.render("views.index", &data)?, "0:a 1:b ");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use minijinja::value::Value as TemplateValue;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use parking_lot::{RwLock, RwLockReadGuard};
use serde_json::Value;

use crate::compiler::Compiler;
use crate::config::SnapConfig;
use crate::directive::{Directive, DirectiveRegistry};
use crate::error::{BladeError, Result};
use crate::host::{NullHost, ThemeHost};
use crate::runtime::functions::{self, HostFunction};
use crate::runtime::{render_root, RenderSession};
use crate::template::helpers::{partial_name, template_name};
use crate::template::{FileSystemLoader, MemoryLoader, TemplateLoader};
use crate::view::{DefaultsProvider, ViewData, ViewDataResolver};

/// Variable holding the view name during [`BladeEngine::render_view`]
pub const CURRENT_VIEW: &str = "current_view";

/// Variable holding the host's current post unless the caller passes one
pub const CURRENT_POST: &str = "post";

/// Compiles and renders templates
pub struct BladeEngine {
    env: RwLock<Environment<'static>>,
    loader: Arc<dyn TemplateLoader>,
    host: Arc<dyn ThemeHost>,
    resolver: ViewDataResolver,
    directives: Arc<DirectiveRegistry>,
    development_mode: bool,
    templates_directory: String,
    extension: String,
}

impl fmt::Debug for BladeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BladeEngine")
            .field("directives", &self.directives.names().len())
            .field("development_mode", &self.development_mode)
            .field("templates_directory", &self.templates_directory)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

/// Load template `name` and expand its directives
fn load_expanded(
    loader: &dyn TemplateLoader,
    directives: &DirectiveRegistry,
    name: &str,
) -> std::result::Result<Option<String>, minijinja::Error> {
    let Some(source) = loader.load(name).map_err(BladeError::into_template_error)? else {
        return Ok(None);
    };
    tracing::debug!(template = name, "compiling template");
    Compiler::new(directives)
        .expand(name, &source)
        .map(Some)
        .map_err(BladeError::into_template_error)
}

fn environment(
    loader: Arc<dyn TemplateLoader>,
    directives: Arc<DirectiveRegistry>,
    host: &dyn ThemeHost,
) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.set_formatter(functions::write_value);
    env.set_loader(move |name| load_expanded(loader.as_ref(), &directives, name));
    functions::register(&mut env);
    for name in host.functions() {
        env.add_global(name.clone(), TemplateValue::from_object(HostFunction::new(name)));
    }
    env
}

impl BladeEngine {
    /// Start building an engine
    #[must_use]
    pub fn builder() -> BladeEngineBuilder {
        BladeEngineBuilder::default()
    }

    /// Builder preset from `config`: file system loader over the configured
    /// roots, recompiling on every render in development mode
    #[must_use]
    pub fn from_config(config: &SnapConfig) -> BladeEngineBuilder {
        let loader = FileSystemLoader::new(config.template_roots(), config.blade.file_extension.clone());
        Self::builder()
            .loader(Arc::new(loader))
            .development_mode(config.blade.development_mode)
            .templates_directory(config.theme.templates_directory.to_string_lossy())
            .extension(config.blade.file_extension.clone())
    }

    /// Site collaborator
    #[must_use]
    pub fn host(&self) -> &dyn ThemeHost {
        self.host.as_ref()
    }

    /// View data resolver
    #[must_use]
    pub const fn resolver(&self) -> &ViewDataResolver {
        &self.resolver
    }

    /// Template source loader
    #[must_use]
    pub fn loader(&self) -> &dyn TemplateLoader {
        self.loader.as_ref()
    }

    /// Registered directives
    #[must_use]
    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    /// Whether templates are recompiled on every render
    #[must_use]
    pub const fn is_development_mode(&self) -> bool {
        self.development_mode
    }

    pub(crate) fn environment(&self) -> RwLockReadGuard<'_, Environment<'static>> {
        self.env.read()
    }

    /// Register `directive`, replacing any directive of the same name
    ///
    /// Compiled templates are dropped so they pick up the change.
    pub fn register_directive(&self, directive: Directive) -> Option<Directive> {
        let previous = self.directives.register(directive);
        self.env.write().clear_templates();
        previous
    }

    /// Remove the directive called `name`; unknown names are ignored
    pub fn remove_directive(&self, name: &str) -> Option<Directive> {
        let removed = self.directives.remove(name);
        if removed.is_some() {
            tracing::debug!(directive = name, "removed directive");
            self.env.write().clear_templates();
        }
        removed
    }

    /// Dotted view name for a theme file slug
    #[must_use]
    pub fn template_name(&self, slug: &str) -> String {
        template_name(slug, &self.templates_directory, &self.extension)
    }

    fn refresh(&self) {
        if self.development_mode {
            self.env.write().clear_templates();
        }
    }

    /// Load, expand and compile template `name`
    ///
    /// The compiled template is kept for later renders unless the engine is
    /// in development mode.
    ///
    /// # Errors
    ///
    /// Returns [`BladeError::TemplateNotFound`] when no loader has the
    /// template, or the compile error.
    pub fn compile(&self, name: &str) -> Result<()> {
        self.refresh();
        self.env
            .read()
            .get_template(name)
            .map(|_| ())
            .map_err(|e| BladeError::from_template(&e, name))
    }

    /// Template code produced by expanding the directives of template `name`
    ///
    /// # Errors
    ///
    /// Returns [`BladeError::TemplateNotFound`] or the directive error.
    pub fn expand(&self, name: &str) -> Result<String> {
        let source = self
            .loader
            .load(name)?
            .ok_or_else(|| BladeError::TemplateNotFound(name.to_string()))?;
        Compiler::new(&self.directives).expand(name, &source)
    }

    /// Root render of template `name`
    ///
    /// `data` is laid over the defaults for `name`. Each call gets its own
    /// loop stack and current-item binding.
    ///
    /// # Errors
    ///
    /// Any compile, collaborator, loop stack or evaluation error aborts the
    /// render; no partial output is returned.
    pub fn render(&self, name: &str, data: &ViewData) -> Result<String> {
        self.render_root(name, data, None)
    }

    /// Root render of the view for theme file `slug`
    ///
    /// The view name is available to templates as `current_view` and to
    /// collaborators through
    /// [`RenderContext::current_view`](crate::runtime::RenderContext::current_view).
    ///
    /// # Errors
    ///
    /// See [`BladeEngine::render`].
    pub fn render_view(&self, slug: &str, data: &ViewData) -> Result<String> {
        let name = self.template_name(slug);
        let mut data = data.clone();
        data.insert(CURRENT_VIEW.to_string(), Value::String(name.clone()));
        let view = name.clone();
        self.render_root(&name, &data, Some(view))
    }

    /// Root render of the partial `slug` outside any view
    ///
    /// # Errors
    ///
    /// See [`BladeEngine::render`].
    pub fn render_partial(&self, slug: &str, data: &ViewData) -> Result<String> {
        self.render(&partial_name(slug), data)
    }

    fn render_root(&self, name: &str, data: &ViewData, view: Option<String>) -> Result<String> {
        self.refresh();
        let env = self.env.read();
        let template = env
            .get_template(name)
            .map_err(|e| BladeError::from_template(&e, name))?;

        let mut data = self.resolver.resolve_root(name, data)?;
        if !data.contains_key(CURRENT_POST) {
            data.insert(CURRENT_POST.to_string(), self.host.current_post());
        }

        tracing::debug!(template = name, "root render");
        let session = RenderSession::new(Arc::clone(&self.host), self.resolver.clone(), view);
        render_root(&template, session, &data)
    }
}

/// Builder for [`BladeEngine`]
pub struct BladeEngineBuilder {
    loader: Arc<dyn TemplateLoader>,
    host: Arc<dyn ThemeHost>,
    resolver: ViewDataResolver,
    development_mode: bool,
    templates_directory: String,
    extension: String,
}

impl Default for BladeEngineBuilder {
    fn default() -> Self {
        let config = SnapConfig::default();
        Self {
            loader: Arc::new(MemoryLoader::new()),
            host: Arc::new(NullHost),
            resolver: ViewDataResolver::default(),
            development_mode: config.blade.development_mode,
            templates_directory: config.theme.templates_directory.to_string_lossy().into_owned(),
            extension: config.blade.file_extension,
        }
    }
}

impl fmt::Debug for BladeEngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BladeEngineBuilder")
            .field("development_mode", &self.development_mode)
            .field("templates_directory", &self.templates_directory)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

impl BladeEngineBuilder {
    /// Where template sources come from
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn TemplateLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Site collaborator
    #[must_use]
    pub fn host(mut self, host: Arc<dyn ThemeHost>) -> Self {
        self.host = host;
        self
    }

    /// Per-template default data
    #[must_use]
    pub fn defaults(mut self, provider: impl DefaultsProvider + 'static) -> Self {
        self.resolver = ViewDataResolver::new(Arc::new(provider));
        self
    }

    /// Reload and recompile templates on every render
    #[must_use]
    pub const fn development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }

    /// Directory prefix stripped by [`BladeEngine::template_name`]
    #[must_use]
    pub fn templates_directory(mut self, directory: impl Into<String>) -> Self {
        self.templates_directory = directory.into();
        self
    }

    /// Template file extension stripped by [`BladeEngine::template_name`]
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Build the engine with the built-in directive set
    #[must_use]
    pub fn build(self) -> BladeEngine {
        tracing::debug!(development_mode = self.development_mode, "building engine");
        let directives = Arc::new(DirectiveRegistry::with_builtins());
        BladeEngine {
            env: RwLock::new(environment(
                Arc::clone(&self.loader),
                Arc::clone(&directives),
                self.host.as_ref(),
            )),
            loader: self.loader,
            host: self.host,
            resolver: self.resolver,
            directives,
            development_mode: self.development_mode,
            templates_directory: self.templates_directory,
            extension: self.extension,
        }
    }
}
