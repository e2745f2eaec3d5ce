//! Compile every template the loader knows

use anyhow::Result;
use snap_blade::prelude::*;

/// Outcome of a check run
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Templates that compiled
    pub passed: Vec<String>,
    /// Templates that failed, with their error
    pub failed: Vec<(String, BladeError)>,
}

impl CheckReport {
    /// Whether every template compiled
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of templates checked
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }
}

/// Compile all templates without rendering them
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckCommand;

impl CheckCommand {
    /// Compile each template and collect the results
    ///
    /// # Errors
    ///
    /// Returns an error only if the templates cannot be listed; compile
    /// failures are collected in the report.
    pub fn execute(self, engine: &BladeEngine) -> Result<CheckReport> {
        let mut report = CheckReport::default();
        for name in engine.loader().list()? {
            match engine.compile(&name) {
                Ok(()) => {
                    tracing::debug!(template = %name, "template compiled");
                    report.passed.push(name);
                }
                Err(e) => {
                    tracing::debug!(template = %name, error = %e, "template failed to compile");
                    report.failed.push((name, e));
                }
            }
        }
        tracing::debug!(
            passed = report.passed.len(),
            failed = report.failed.len(),
            "check finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_collects_failures() {
        let loader = MemoryLoader::new()
            .with("views.ok", "@auth hi @endauth")
            .with("views.unclosed", "@loop")
            .with("views.unknown", "@frobnicate");
        let engine = BladeEngine::builder().loader(Arc::new(loader)).build();

        let report = CheckCommand.execute(&engine).unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.total(), 3);
        assert_eq!(report.passed, vec!["views.ok".to_string()]);
        let failed: Vec<&str> = report.failed.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(failed, vec!["views.unclosed", "views.unknown"]);
    }
}
