// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! vaultkit - log in to a vault and obtain access tokens.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vaultkit_cli_auth::AuthError;
use vaultkit_cli_config::{load_config_with_cli, runtime::LoggingConfig, CliOverrides, LogFormat};

mod commands;
mod input;

/// vaultkit - vault credentials and access tokens
#[derive(Parser, Debug)]
#[command(name = "vaultkit", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Vault base URL (overrides config)
	#[arg(long, global = true)]
	url: Option<String>,

	/// Vault organisation account (overrides config)
	#[arg(long, global = true)]
	account: Option<String>,

	/// Credential store: auto, file or keyring (overrides config)
	#[arg(long, global = true)]
	credential_store: Option<String>,

	/// Log level (overrides config)
	#[arg(short, long, global = true)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long, global = true)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Store credentials for the configured vault
	Login {
		/// Login name of the user or host
		#[arg(short = 'i', long = "id")]
		login: String,

		/// Read the password from stdin and exchange it for an API key
		#[arg(long, conflicts_with = "api_key_stdin")]
		password_stdin: bool,

		/// Read the API key from stdin
		#[arg(long)]
		api_key_stdin: bool,
	},
	/// Remove stored credentials for the configured vault
	Logout,
	/// Print a short-lived access token
	Authenticate,
	/// Print who the vault thinks you are
	Whoami,
	/// Rotate an API key and print the new one
	RotateApiKey {
		/// Rotate this principal's key instead of your own (kind:id)
		#[arg(long)]
		role: Option<String>,
	},
	/// Show which credential store is in use
	CredentialStore,
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		Self {
			url: args.url.clone(),
			account: args.account.clone(),
			credential_store: args.credential_store.clone(),
			log_level: args.log_level.clone(),
			log_format: args.json_logs.then(|| "json".to_string()),
			config_file: args.config.clone(),
		}
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(&logging.level))
		.unwrap_or_else(|_| EnvFilter::new("warn"));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().pretty().with_writer(std::io::stderr))
				.init();
		}
	}
}

async fn run(args: Args) -> Result<()> {
	let config =
		load_config_with_cli(CliOverrides::from(&args)).context("failed to load configuration")?;

	init_tracing(&config.logging);
	debug!(command = ?args.command, "starting vaultkit");

	match args.command {
		Command::Login {
			login,
			password_stdin,
			api_key_stdin,
		} => commands::login(&config, &login, password_stdin, api_key_stdin).await,
		Command::Logout => commands::logout(&config).await,
		Command::Authenticate => commands::authenticate(&config).await,
		Command::Whoami => commands::whoami(&config).await,
		Command::RotateApiKey { role } => commands::rotate_api_key(&config, role.as_deref()).await,
		Command::CredentialStore => commands::credential_store(&config).await,
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	match run(args).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("error: {err:#}");
			let not_logged_in = err
				.chain()
				.any(|cause| matches!(cause.downcast_ref::<AuthError>(), Some(e) if e.is_not_logged_in()));
			if not_logged_in {
				eprintln!("hint: run `vaultkit login -i <login>` first");
			}
			ExitCode::FAILURE
		}
	}
}
