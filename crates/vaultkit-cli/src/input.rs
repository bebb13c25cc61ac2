// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reading secrets from stdin.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{bail, Context, Result};
use vaultkit_common_secret::SecretString;

/// Read one line from stdin, prompting on stderr when stdin is a terminal.
pub fn read_secret(prompt: &str) -> Result<SecretString> {
	let stdin = io::stdin();
	if stdin.is_terminal() {
		eprint!("{prompt}: ");
		io::stderr().flush().ok();
	}
	read_secret_from(stdin.lock())
}

pub fn read_secret_from(mut reader: impl BufRead) -> Result<SecretString> {
	let mut line = String::new();
	reader
		.read_line(&mut line)
		.context("failed to read from stdin")?;

	let secret = SecretString::new(line.trim_end_matches(['\r', '\n']).to_string());
	line.clear();
	if secret.is_blank() {
		bail!("no secret provided on stdin");
	}
	Ok(secret)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_reads_first_line_without_newline() {
		let secret = read_secret_from("k1\r\nignored\n".as_bytes()).unwrap();
		assert_eq!(secret.expose(), "k1");
	}

	#[test]
	fn test_empty_input_is_rejected() {
		assert!(read_secret_from("".as_bytes()).is_err());
		assert!(read_secret_from("  \n".as_bytes()).is_err());
	}
}
