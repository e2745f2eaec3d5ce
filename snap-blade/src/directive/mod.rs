//! Directive registry
//!
//! A directive is a named expander that rewrites `@name(arguments)` in
//! template source into host template code. Directives that open, continue
//! or close a block declare a [`BlockRole`] so the compiler can check their
//! nesting before anything runs.
//!
//! ```rust
//! use snap_blade::directive::{strip_parens, Directive, DirectiveRegistry};
//!
//! let registry = DirectiveRegistry::new();
//! registry.register(Directive::new("upper", |args| {
//!     Ok(format!("{{{{ {}|upper }}}}", strip_parens(args)))
//! }));
//!
//! assert_eq!(registry.expand("upper", "(title)").unwrap(), "{{ title|upper }}");
//! registry.remove("upper");
//! assert!(registry.expand("upper", "(title)").is_err());
//! ```

pub mod args;
pub mod builtin;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::CompileError;

pub use args::{parse_loop, strip_parens, IterationArgs, PartialArgs};

type Expander = Arc<dyn Fn(&str) -> Result<String, CompileError> + Send + Sync>;

/// Position of a directive within a block
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BlockRole {
    /// Stands alone
    #[default]
    Inline,
    /// Opens a block of the named group
    Open(String),
    /// Continues an open block of the named group (`@elsecan`)
    Continue(String),
    /// Closes an open block of the named group
    Close(String),
}

/// A named expander
#[derive(Clone)]
pub struct Directive {
    name: String,
    role: BlockRole,
    bare_iteration: bool,
    expander: Expander,
}

impl Directive {
    /// Create an inline directive
    ///
    /// `expander` receives the argument text as written, including any
    /// parentheses, and returns the code that replaces the directive.
    pub fn new<F>(name: impl Into<String>, expander: F) -> Self
    where
        F: Fn(&str) -> Result<String, CompileError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            role: BlockRole::Inline,
            bare_iteration: false,
            expander: Arc::new(expander),
        }
    }

    /// Mark this directive as opening a `group` block
    #[must_use]
    pub fn opens(mut self, group: impl Into<String>) -> Self {
        self.role = BlockRole::Open(group.into());
        self
    }

    /// Mark this directive as continuing a `group` block
    #[must_use]
    pub fn continues(mut self, group: impl Into<String>) -> Self {
        self.role = BlockRole::Continue(group.into());
        self
    }

    /// Mark this directive as closing a `group` block
    #[must_use]
    pub fn closes(mut self, group: impl Into<String>) -> Self {
        self.role = BlockRole::Close(group.into());
        self
    }

    /// Also accept `@name items as $item` without parentheses
    ///
    /// The compiler then takes a following `<variable> as <binding>` as the
    /// argument text, so the expander sees ` items as $item`.
    #[must_use]
    pub const fn bare_iteration(mut self) -> Self {
        self.bare_iteration = true;
        self
    }

    /// Whether [`Directive::bare_iteration`] was requested
    #[must_use]
    pub const fn takes_bare_iteration(&self) -> bool {
        self.bare_iteration
    }

    /// Directive name, without `@`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block role
    #[must_use]
    pub const fn role(&self) -> &BlockRole {
        &self.role
    }

    /// Run the expander on `args`
    ///
    /// # Errors
    ///
    /// Returns whatever the expander reports, typically
    /// [`CompileError::MalformedDirective`].
    pub fn expand(&self, args: &str) -> Result<String, CompileError> {
        (self.expander)(args)
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("bare_iteration", &self.bare_iteration)
            .finish_non_exhaustive()
    }
}

/// Directives known to an engine, keyed by name
#[derive(Debug, Default)]
pub struct DirectiveRegistry {
    directives: RwLock<HashMap<String, Directive>>,
}

impl DirectiveRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in directive set
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for directive in builtin::directives() {
            registry.register(directive);
        }
        registry
    }

    /// Add `directive`, replacing any directive of the same name
    ///
    /// Returns the replaced directive.
    pub fn register(&self, directive: Directive) -> Option<Directive> {
        tracing::debug!(directive = directive.name(), "registering directive");
        self.directives
            .write()
            .insert(directive.name.clone(), directive)
    }

    /// Remove the directive called `name`; unknown names are ignored
    pub fn remove(&self, name: &str) -> Option<Directive> {
        self.directives.write().remove(name)
    }

    /// Look up a directive
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Directive> {
        self.directives.read().get(name).cloned()
    }

    /// Whether a directive called `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.directives.read().contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.directives.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Expand directive `name` with argument text `args`
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnknownDirective`] if nothing is registered
    /// under `name`, otherwise whatever the expander reports.
    pub fn expand(&self, name: &str, args: &str) -> Result<String, CompileError> {
        let directive = self
            .get(name)
            .ok_or_else(|| CompileError::UnknownDirective(name.to_string()))?;
        directive.expand(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_later_registration_wins() {
        let registry = DirectiveRegistry::new();
        registry.register(Directive::new("x", |_| Ok("first".into())));
        let replaced = registry.register(Directive::new("x", |_| Ok("second".into())));

        assert!(replaced.is_some());
        assert_eq!(registry.expand("x", "").unwrap(), "second");
    }

    #[test]
    fn test_remove_then_expand_is_unknown() {
        let registry = DirectiveRegistry::new();
        registry.register(Directive::new("x", |_| Ok(String::new())));
        registry.remove("x");

        assert_eq!(
            registry.expand("x", ""),
            Err(CompileError::UnknownDirective("x".into()))
        );
        // removing again is a no-op
        assert!(registry.remove("x").is_none());
    }

    #[test]
    fn test_expander_receives_argument_text() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let registry = DirectiveRegistry::new();
        registry.register(Directive::new("echo", move |args| {
            sink.lock().unwrap().push(args.to_string());
            Ok(strip_parens(args).to_string())
        }));

        assert_eq!(registry.expand("echo", "( a, b )").unwrap(), "a, b");
        assert_eq!(seen.lock().unwrap().as_slice(), ["( a, b )".to_string()]);
    }

    #[test]
    fn test_roles() {
        let open = Directive::new("a", |_| Ok(String::new())).opens("grp");
        let close = Directive::new("b", |_| Ok(String::new())).closes("grp");
        assert_eq!(open.role(), &BlockRole::Open("grp".into()));
        assert_eq!(close.role(), &BlockRole::Close("grp".into()));
        assert_eq!(
            Directive::new("c", |_| Ok(String::new())).role(),
            &BlockRole::Inline
        );
    }

    #[test]
    fn test_builtins_registered() {
        let registry = DirectiveRegistry::with_builtins();
        for name in ["loop", "endloop", "simplemenu", "partial", "paginate", "sidebar"] {
            assert!(registry.contains(name), "missing @{name}");
        }
    }
}
