// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the vaultkit CLI.
//!
//! This crate provides:
//! - XDG Base Directory compliant path resolution
//! - Layered configuration from multiple sources
//! - TOML configuration file parsing
//! - Environment variable overrides
//! - Configuration validation

pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::PathsConfig;
pub use registry::ConfigRegistry;
pub use runtime::{LogFormat, StoreChoice, VaultkitConfig};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration from all sources with CLI overrides on top.
///
/// `cli.config_file`, when set, replaces the user config file.
pub fn load_config_with_cli(cli: CliOverrides) -> Result<VaultkitConfig, ConfigError> {
	let paths = paths::resolve_xdg_paths()?;

	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	match &cli.config_file {
		Some(path) => registry.register(Box::new(sources::FileSource::custom(
			path.clone(),
			Precedence::UserFile,
			"cli-config",
		))),
		None => registry.register(Box::new(sources::FileSource::user(&paths))),
	}
	registry.register(Box::new(sources::EnvSource::from_process()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(paths)
}
