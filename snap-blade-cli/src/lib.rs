//! snap-blade CLI library

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod commands;
pub mod fixture;

use std::path::PathBuf;
use std::sync::Arc;

use snap_blade::prelude::*;

pub use fixture::{Fixture, FixtureHost};

/// Apply `--templates` overrides: the first directory becomes the primary
/// one, the rest are fallbacks in order
pub fn apply_template_dirs(config: &mut SnapConfig, dirs: &[PathBuf]) {
    if let Some((primary, fallbacks)) = dirs.split_first() {
        config.theme.templates_directory.clone_from(primary);
        config.theme.fallback_directories = fallbacks.to_vec();
    }
}

/// Engine over the configured template roots answering from `fixture`
#[must_use]
pub fn build_engine(config: &SnapConfig, fixture: &Fixture) -> BladeEngine {
    BladeEngine::from_config(config)
        .host(Arc::new(fixture.host()))
        .defaults(fixture.composers())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_dir_overrides() {
        let mut config = SnapConfig::default();
        apply_template_dirs(
            &mut config,
            &[PathBuf::from("child"), PathBuf::from("parent")],
        );
        assert_eq!(
            config.template_roots(),
            vec![PathBuf::from("child"), PathBuf::from("parent")]
        );
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = SnapConfig::default();
        apply_template_dirs(&mut config, &[]);
        assert_eq!(config, SnapConfig::default());
    }
}
