//! `.mudlexusrc` host setup file parser.
//!
//! Populates the standalone host's variables and reflexes:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | set a host variable |
//! | `/alias <name> [-d]` | register an alias (`-d`: starts disabled) |
//! | `/key <name> [-d]` | register a keybind |
//! | `/trigger <name> [-d]` | register a trigger |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! The shim itself only ever reads `mudlexus_version` from the result.

use std::path::Path;

use crate::reflex::{ReflexKind, ReflexStore};
use crate::var::VarStore;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Parsed host setup: variables and reflexes.
#[derive(Debug, Default)]
pub struct Config {
    pub vars: VarStore,
    pub reflexes: ReflexStore,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Returns the config and a list of any errors on recognised lines;
    /// a bad line does not stop the rest of the file from loading.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));
            let tokens = split_args(args_str.trim());

            let result = match cmd {
                "set" => parse_set(&tokens, &mut config.vars),
                "alias" => parse_reflex(ReflexKind::Alias, cmd, &tokens, &mut config.reflexes),
                "key" => parse_reflex(ReflexKind::Keybind, cmd, &tokens, &mut config.reflexes),
                "trigger" => parse_reflex(ReflexKind::Trigger, cmd, &tokens, &mut config.reflexes),
                _ => Ok(()),
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if !in_quotes => {
                in_quotes = true;
                quoted = true;
            }
            '"' if in_quotes => in_quotes = false,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() || quoted {
                    args.push(std::mem::take(&mut cur));
                }
                quoted = false;
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() || quoted {
        args.push(cur);
    }
    args
}

// ── Directives ────────────────────────────────────────────────────────────────

fn parse_set(tokens: &[String], vars: &mut VarStore) -> Result<(), String> {
    let Some(first) = tokens.first() else {
        return Err("/set: requires an argument".into());
    };

    let (name, value) = if let Some((name, value)) = first.split_once('=') {
        (name.to_owned(), value.to_owned())
    } else if tokens.len() >= 2 {
        (first.clone(), tokens[1..].join(" "))
    } else {
        return Err(format!("/set: missing value for '{first}'"));
    };

    if name.is_empty() {
        return Err("/set: variable name cannot be empty".into());
    }

    vars.set(name, value);
    Ok(())
}

/// `/<cmd> [-d] <name> [-d]`: the flag may come before or after the name.
fn parse_reflex(
    kind: ReflexKind,
    cmd: &str,
    tokens: &[String],
    reflexes: &mut ReflexStore,
) -> Result<(), String> {
    let mut enabled = true;
    let mut name: Option<&str> = None;

    for tok in tokens {
        match tok.as_str() {
            "-d" => enabled = false,
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("/{cmd}: unknown option '{flag}'"));
            }
            word if name.is_none() => name = Some(word),
            extra => return Err(format!("/{cmd}: unexpected argument '{extra}'")),
        }
    }

    match name {
        Some(n) if !n.is_empty() => {
            reflexes.add(kind, n, enabled);
            Ok(())
        }
        _ => Err(format!("/{cmd}: requires a name")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
