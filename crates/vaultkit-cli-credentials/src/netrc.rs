// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! netrc document model.
//!
//! The credential file is shared with curl, git, ftp and friends, so the
//! parser keeps every block it understands (machines, the `default` entry,
//! `account` fields and `macdef` bodies) and [`Netrc::render`] writes all of
//! them back. Comment lines are dropped on rewrite.
//!
//! Rendered output is one keyword/value pair per line in the order
//! `machine`, `login`, `password`, `account`, with a single blank line between
//! blocks and none before the first.

use std::collections::VecDeque;
use std::fmt;

/// Error parsing a netrc document. Never echoes token values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct NetrcError {
	pub line: usize,
	pub message: String,
}

impl NetrcError {
	fn new(line: usize, message: impl Into<String>) -> Self {
		Self {
			line,
			message: message.into(),
		}
	}
}

/// A `machine` block, or the `default` block when `name` is `None`.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Machine {
	pub name: Option<String>,
	pub login: Option<String>,
	pub password: Option<String>,
	pub account: Option<String>,
}

impl Machine {
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			..Default::default()
		}
	}

	/// True when this machine is `host` itself or a path below it, so the
	/// configured `https://v` matches a stored `https://v/authn` but never
	/// `https://v2/authn`.
	pub fn matches(&self, host: &str) -> bool {
		match &self.name {
			Some(name) => {
				let host = host.trim_end_matches('/');
				name == host
					|| name
						.strip_prefix(host)
						.is_some_and(|rest| rest.starts_with('/'))
			}
			None => false,
		}
	}
}

impl fmt::Debug for Machine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Machine")
			.field("name", &self.name)
			.field("login", &self.login)
			.field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
			.field("account", &self.account)
			.finish()
	}
}

/// A `macdef` block; the body runs until the next blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
	pub name: String,
	pub body: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
	Machine(Machine),
	Macro(Macro),
}

/// A parsed netrc file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Netrc {
	blocks: Vec<Block>,
}

impl Netrc {
	pub fn parse(input: &str) -> Result<Self, NetrcError> {
		let mut lexer = Lexer::new(input);
		let mut blocks = Vec::new();
		let mut current: Option<Machine> = None;

		while let Some((line, token)) = lexer.next_token() {
			match token {
				"machine" => {
					blocks.extend(current.take().map(Block::Machine));
					let name = lexer.value_for(line, "machine")?;
					current = Some(Machine::named(name));
				}
				"default" => {
					blocks.extend(current.take().map(Block::Machine));
					current = Some(Machine::default());
				}
				"login" | "password" | "account" => {
					let machine = current.as_mut().ok_or_else(|| {
						NetrcError::new(line, format!("'{token}' appears before any machine"))
					})?;
					let value = Some(lexer.value_for(line, token)?.to_string());
					match token {
						"login" => machine.login = value,
						"password" => machine.password = value,
						_ => machine.account = value,
					}
				}
				"macdef" => {
					blocks.extend(current.take().map(Block::Machine));
					let name = lexer.value_for(line, "macdef")?.to_string();
					let body = lexer.take_macro_body();
					blocks.push(Block::Macro(Macro { name, body }));
				}
				_ => return Err(NetrcError::new(line, "unexpected token")),
			}
		}
		blocks.extend(current.map(Block::Machine));

		Ok(Self { blocks })
	}

	pub fn render(&self) -> String {
		let mut out = String::new();
		for (i, block) in self.blocks.iter().enumerate() {
			if i > 0 {
				out.push('\n');
			}
			match block {
				Block::Machine(machine) => render_machine(&mut out, machine),
				Block::Macro(mac) => {
					push_line(&mut out, "macdef", &mac.name);
					for line in &mac.body {
						out.push_str(line);
						out.push('\n');
					}
				}
			}
		}
		out
	}

	pub fn is_empty(&self) -> bool {
		self.blocks.is_empty()
	}

	pub fn blocks(&self) -> &[Block] {
		&self.blocks
	}

	pub fn machines(&self) -> impl Iterator<Item = &Machine> {
		self.blocks.iter().filter_map(|block| match block {
			Block::Machine(machine) => Some(machine),
			Block::Macro(_) => None,
		})
	}

	/// The machine stored for `host`: an exact match wins over a path match.
	pub fn find(&self, host: &str) -> Option<&Machine> {
		self.position(host).and_then(|i| match &self.blocks[i] {
			Block::Machine(machine) => Some(machine),
			Block::Macro(_) => None,
		})
	}

	/// Replace login/password of the machine named exactly `host`, or append a
	/// new machine. Other fields and other blocks are untouched.
	pub fn upsert(&mut self, host: &str, login: &str, password: &str) {
		let existing = self.blocks.iter_mut().find_map(|block| match block {
			Block::Machine(machine) if machine.name.as_deref() == Some(host) => Some(machine),
			_ => None,
		});

		match existing {
			Some(machine) => {
				machine.login = Some(login.to_string());
				machine.password = Some(password.to_string());
			}
			None => {
				let machine = Machine {
					login: Some(login.to_string()),
					password: Some(password.to_string()),
					..Machine::named(host)
				};
				// `default` has to stay last for other netrc readers.
				let at = self
					.blocks
					.iter()
					.position(|block| matches!(block, Block::Machine(m) if m.name.is_none()))
					.unwrap_or(self.blocks.len());
				self.blocks.insert(at, Block::Machine(machine));
			}
		}
	}

	/// Replace login/password of the machine found for `host`. Returns false
	/// when nothing matched.
	pub fn update(&mut self, host: &str, login: &str, password: &str) -> bool {
		match self.position(host) {
			Some(i) => {
				if let Block::Machine(machine) = &mut self.blocks[i] {
					machine.login = Some(login.to_string());
					machine.password = Some(password.to_string());
				}
				true
			}
			None => false,
		}
	}

	/// Drop the machine found for `host`. Returns the removed machine.
	pub fn remove(&mut self, host: &str) -> Option<Machine> {
		let i = self.position(host)?;
		match self.blocks.remove(i) {
			Block::Machine(machine) => Some(machine),
			Block::Macro(_) => None,
		}
	}

	fn position(&self, host: &str) -> Option<usize> {
		let exact = self.blocks.iter().position(
			|block| matches!(block, Block::Machine(m) if m.name.as_deref() == Some(host)),
		);
		exact.or_else(|| {
			self.blocks
				.iter()
				.position(|block| matches!(block, Block::Machine(m) if m.matches(host)))
		})
	}
}

fn render_machine(out: &mut String, machine: &Machine) {
	match &machine.name {
		Some(name) => push_line(out, "machine", name),
		None => {
			out.push_str("default\n");
		}
	}
	if let Some(login) = &machine.login {
		push_line(out, "login", login);
	}
	if let Some(password) = &machine.password {
		push_line(out, "password", password);
	}
	if let Some(account) = &machine.account {
		push_line(out, "account", account);
	}
}

fn push_line(out: &mut String, keyword: &str, value: &str) {
	out.push_str(keyword);
	out.push(' ');
	out.push_str(value.trim_matches('\t'));
	out.push('\n');
}

/// Whitespace tokenizer that remembers line numbers and can hand the raw
/// following lines to `macdef`.
struct Lexer<'a> {
	lines: Vec<&'a str>,
	next_line: usize,
	tokens: VecDeque<&'a str>,
}

impl<'a> Lexer<'a> {
	fn new(input: &'a str) -> Self {
		Self {
			lines: input.lines().collect(),
			next_line: 0,
			tokens: VecDeque::new(),
		}
	}

	/// 1-based number of the line the queued tokens came from.
	fn line(&self) -> usize {
		self.next_line
	}

	fn next_token(&mut self) -> Option<(usize, &'a str)> {
		loop {
			if let Some(token) = self.tokens.pop_front() {
				return Some((self.line(), token));
			}
			let text = *self.lines.get(self.next_line)?;
			self.next_line += 1;
			if text.trim_start().starts_with('#') {
				continue;
			}
			self.tokens = text.split_whitespace().collect();
		}
	}

	fn value_for(&mut self, line: usize, keyword: &str) -> Result<&'a str, NetrcError> {
		self.next_token()
			.map(|(_, value)| value)
			.ok_or_else(|| NetrcError::new(line, format!("missing value for '{keyword}'")))
	}

	fn take_macro_body(&mut self) -> Vec<String> {
		self.tokens.clear();
		let mut body = Vec::new();
		while let Some(text) = self.lines.get(self.next_line) {
			self.next_line += 1;
			if text.trim().is_empty() {
				break;
			}
			body.push(text.to_string());
		}
		body
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const TWO_HOSTS: &str = "machine https://v/authn\nlogin admin\npassword k1\n\nmachine https://other/authn\nlogin alice\npassword k9\n";

	#[test]
	fn test_parses_and_renders_two_entries_unchanged() {
		let netrc = Netrc::parse(TWO_HOSTS).unwrap();
		assert_eq!(netrc.machines().count(), 2);
		assert_eq!(netrc.render(), TWO_HOSTS);
	}

	#[test]
	fn test_parses_single_line_and_tab_indented_forms() {
		let input = "machine api.github.com login octo password ghp_x\nmachine https://v/authn\n\tlogin admin\n\tpassword k1\n";
		let netrc = Netrc::parse(input).unwrap();

		let github = netrc.find("api.github.com").unwrap();
		assert_eq!(github.login.as_deref(), Some("octo"));

		let rendered = netrc.render();
		assert!(!rendered.contains('\t'));
		assert_eq!(
			rendered,
			"machine api.github.com\nlogin octo\npassword ghp_x\n\nmachine https://v/authn\nlogin admin\npassword k1\n"
		);
	}

	#[test]
	fn test_keeps_default_account_and_macdef_blocks() {
		let input = "machine ftp.example.com\nlogin anon\npassword x\naccount acct1\n\nmacdef init\ncd /pub\nbinary\n\ndefault\nlogin guest\npassword guest\n";
		let netrc = Netrc::parse(input).unwrap();
		assert_eq!(netrc.blocks().len(), 3);
		assert_eq!(netrc.render(), input);
	}

	#[test]
	fn test_comment_lines_are_skipped() {
		let netrc = Netrc::parse("# managed by hand\nmachine h\nlogin l\npassword p\n").unwrap();
		assert_eq!(netrc.render(), "machine h\nlogin l\npassword p\n");
	}

	#[test]
	fn test_find_prefers_exact_then_path_match() {
		let netrc = Netrc::parse("machine https://v2/authn login b password 2\nmachine https://v/authn login a password 1\n").unwrap();

		assert_eq!(netrc.find("https://v").unwrap().login.as_deref(), Some("a"));
		assert_eq!(netrc.find("https://v/").unwrap().login.as_deref(), Some("a"));
		assert_eq!(netrc.find("https://v2/authn").unwrap().login.as_deref(), Some("b"));
		assert!(netrc.find("https://v3").is_none());
	}

	#[test]
	fn test_upsert_replaces_in_place_and_appends_before_default() {
		let mut netrc = Netrc::parse("machine a login x password 1\ndefault login anonymous\n").unwrap();

		netrc.upsert("a", "x", "2");
		netrc.upsert("b", "y", "3");

		assert_eq!(
			netrc.render(),
			"machine a\nlogin x\npassword 2\n\nmachine b\nlogin y\npassword 3\n\ndefault\nlogin anonymous\n"
		);
	}

	#[test]
	fn test_remove_leaves_other_hosts() {
		let mut netrc = Netrc::parse(TWO_HOSTS).unwrap();
		let removed = netrc.remove("https://v/authn").unwrap();
		assert_eq!(removed.login.as_deref(), Some("admin"));
		assert_eq!(
			netrc.render(),
			"machine https://other/authn\nlogin alice\npassword k9\n"
		);
	}

	#[test]
	fn test_errors_report_line_without_values() {
		let err = Netrc::parse("login admin\n").unwrap_err();
		assert_eq!(err.line, 1);

		let err = Netrc::parse("machine h\nlogin admin\npassword\n").unwrap_err();
		assert_eq!(err.line, 3);
		assert!(err.message.contains("password"));

		let err = Netrc::parse("machine h\nlogin admin\nhunter2\n").unwrap_err();
		assert_eq!(err.line, 3);
		assert!(!err.to_string().contains("hunter2"));
	}

	#[test]
	fn test_machine_debug_redacts_password() {
		let netrc = Netrc::parse("machine h login l password hunter2\n").unwrap();
		let rendered = format!("{netrc:?}");
		assert!(!rendered.contains("hunter2"));
	}

	fn token() -> impl Strategy<Value = String> {
		"[a-zA-Z0-9:/._@-]{1,24}".prop_filter("keyword", |t| {
			!matches!(
				t.as_str(),
				"machine" | "default" | "login" | "password" | "account" | "macdef"
			) && !t.starts_with('#')
		})
	}

	proptest! {
		#[test]
		fn test_render_then_parse_preserves_every_machine(
			entries in prop::collection::btree_map(token(), (token(), token()), 0..6)
		) {
			let mut netrc = Netrc::default();
			for (host, (login, password)) in &entries {
				netrc.upsert(host, login, password);
			}

			let reparsed = Netrc::parse(&netrc.render()).unwrap();
			prop_assert_eq!(&reparsed, &netrc);
			prop_assert!(!netrc.render().contains('\t'));
			prop_assert!(!netrc.render().starts_with('\n'));
		}
	}
}
