//! Error types and error handling
//!
//! Every failure aborts the enclosing render. Compile-time failures carry the
//! template name and the source line of the offending tag; collaborator
//! failures keep the host's original error as their source.

use minijinja::ErrorKind;
use thiserror::Error;

use crate::runtime::LoopStackError;

/// Result alias used throughout the crate
pub type Result<T, E = BladeError> = std::result::Result<T, E>;

/// Framework error type
#[derive(Debug, Error)]
pub enum BladeError {
    /// Template could not be compiled
    #[error("{template}:{line}: {error}")]
    Compile {
        /// Template being compiled
        template: String,
        /// 1-based source line of the failing tag
        line: usize,
        /// What went wrong
        error: CompileError,
    },

    /// No loader could provide the template
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Template file exists but could not be read
    #[error("failed to read template '{name}': {source}")]
    Io {
        /// Template name
        name: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The loop context stack was used out of order
    #[error("loop stack invariant violated: {0}")]
    LoopStack(#[from] LoopStackError),

    /// A child render was requested without an enclosing render
    #[error("child render of '{0}' requested outside an active render")]
    NoActiveRender(String),

    /// Expression evaluation failed at render time
    #[error("error rendering '{template}' at line {line}: {message}")]
    Eval {
        /// Template being rendered
        template: String,
        /// 1-based source line of the failing tag
        line: usize,
        /// Description of the failure
        message: String,
    },

    /// A host collaborator returned an error
    #[error("{function} failed: {source}")]
    Collaborator {
        /// Collaborator capability that failed (e.g. `nav_menu`)
        function: String,
        /// Error returned by the host, unmodified
        source: anyhow::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BladeError {
    /// Wrap a host failure
    pub fn collaborator(function: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Collaborator {
            function: function.into(),
            source,
        }
    }

    /// Build an evaluation error for `template`
    pub fn eval(template: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Eval {
            template: template.into(),
            line,
            message: message.into(),
        }
    }

    /// Recover the failure behind a template engine error
    ///
    /// Errors raised by this crate travel through the template engine as the
    /// source of its error and come back out unchanged. Anything else is the
    /// engine's own complaint about `template`.
    #[must_use]
    pub fn from_template(error: &minijinja::Error, template: &str) -> Self {
        let mut source = std::error::Error::source(error);
        while let Some(current) = source {
            if let Some(blade) = current.downcast_ref::<Self>() {
                return blade.duplicate();
            }
            source = current.source();
        }

        let located = error.name().unwrap_or(template).to_string();
        let line = error.line().unwrap_or(0);
        let message = error
            .detail()
            .map_or_else(|| error.kind().to_string(), ToString::to_string);
        match error.kind() {
            ErrorKind::TemplateNotFound => Self::TemplateNotFound(template.to_string()),
            ErrorKind::SyntaxError => CompileError::Syntax(message).at(located, line),
            _ => Self::Eval {
                template: located,
                line,
                message,
            },
        }
    }

    /// Carry this error through the template engine
    #[must_use]
    pub fn into_template_error(self) -> minijinja::Error {
        minijinja::Error::new(ErrorKind::InvalidOperation, self.to_string()).with_source(self)
    }

    /// Rebuild an error seen by reference inside an error chain
    fn duplicate(&self) -> Self {
        match self {
            Self::Compile {
                template,
                line,
                error,
            } => error.clone().at(template.clone(), *line),
            Self::TemplateNotFound(name) => Self::TemplateNotFound(name.clone()),
            Self::Io { name, source } => Self::Io {
                name: name.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Self::LoopStack(error) => Self::LoopStack(error.clone()),
            Self::NoActiveRender(name) => Self::NoActiveRender(name.clone()),
            Self::Eval {
                template,
                line,
                message,
            } => Self::eval(template.clone(), *line, message.clone()),
            Self::Collaborator { function, source } => {
                Self::collaborator(function.clone(), anyhow::anyhow!("{source:#}"))
            }
            Self::Config(message) => Self::Config(message.clone()),
        }
    }

    /// The compile error kind, if this is a compile failure
    #[must_use]
    pub const fn compile_error(&self) -> Option<&CompileError> {
        match self {
            Self::Compile { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Reasons a template fails to compile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// No expander is registered under this name
    #[error("unknown directive @{0}")]
    UnknownDirective(String),

    /// The directive's argument text does not match its syntax
    #[error("malformed @{directive} directive: {reason} (argument: `{argument}`)")]
    MalformedDirective {
        /// Directive name
        directive: String,
        /// Raw argument text as written in the template
        argument: String,
        /// What was expected
        reason: String,
    },

    /// Block directives are not properly nested
    #[error("unbalanced directive @{found}: {reason}")]
    UnbalancedDirective {
        /// Directive that broke the nesting
        found: String,
        /// Description of the expected nesting
        reason: String,
    },

    /// Template source (or code emitted by a directive) is not valid syntax
    #[error("syntax error: {0}")]
    Syntax(String),
}

impl CompileError {
    /// Shorthand for [`CompileError::MalformedDirective`]
    pub fn malformed(
        directive: impl Into<String>,
        argument: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedDirective {
            directive: directive.into(),
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Attach a template location
    pub fn at(self, template: impl Into<String>, line: usize) -> BladeError {
        BladeError::Compile {
            template: template.into(),
            line,
            error: self,
        }
    }
}
