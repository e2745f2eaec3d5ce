//! Logging setup
//!
//! The library only emits `tracing` events. Binaries call [`init`] once to
//! install a subscriber; output goes to stderr so rendered templates on
//! stdout stay clean.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// Multi-line output for development
    Pretty,
    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Lower the default level to `debug`
    pub verbose: bool,

    /// Output format
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Configuration with `verbose` set
    #[must_use]
    pub fn verbose(verbose: bool) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    /// Use `format` for log lines
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Filter used when `RUST_LOG` is not set
    #[must_use]
    pub const fn default_directive(&self) -> &'static str {
        if self.verbose {
            "debug,snap_blade=trace"
        } else {
            "info"
        }
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides the level chosen by `config`.
///
/// # Example
///
/// ```rust,no_run
/// use snap_blade::observability::{self, LoggingConfig};
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init(&LoggingConfig::verbose(true))?;
/// tracing::info!("renderer started");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.format {
        LogFormat::Compact => registry.with(fmt.compact()).try_init()?,
        LogFormat::Pretty => registry.with(fmt.pretty()).try_init()?,
        LogFormat::Json => registry.with(fmt.json()).try_init()?,
    }
    Ok(())
}
