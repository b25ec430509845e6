//! Host primitives consumed by the Lua bridge.
//!
//! [`Host`] is the seam between the shim and the MUD client.  The bridge in
//! [`crate::lua`] re-exports each method as a Lua global:
//!
//! | Lua global                                   | Rust method                     |
//! |----------------------------------------------|---------------------------------|
//! | `send_command(text, suppressExpansion)`      | [`Host::send_command`]          |
//! | `display_notice(text)`                       | [`Host::display_notice`]        |
//! | `reflex_find_by_name(kind, name, cs, incl)`  | [`Host::reflex_find_by_name`]   |
//! | `reflex_enable(ref)`                         | [`Host::reflex_enable`]         |
//! | `reflex_disable(ref)`                        | [`Host::reflex_disable`]        |
//! | `print(...)`                                 | [`Host::console`]               |
//!
//! The host runs on a single thread; methods take `&self` and implementors
//! use interior mutability where they need it.

use std::cell::RefCell;
use std::io::Write;

use thiserror::Error;
use tracing::{debug, info};

use crate::reflex::{ReflexKind, ReflexRef, ReflexStore};
use crate::var::VarStore;

// ── HostError ─────────────────────────────────────────────────────────────────

/// Failure raised by a host primitive.  Propagated to Lua unchanged.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("reflex {} #{} does not exist", .0.kind, .0.id)]
    StaleReflex(ReflexRef),

    #[error("host output failed: {0}")]
    Io(#[from] std::io::Error),
}

// ── Host ──────────────────────────────────────────────────────────────────────

/// The automation API a host client exposes to embedded scripts.
pub trait Host {
    /// Send `text` to the game.  When `suppress_expansion` is false the host
    /// may run it through its own alias expansion first.
    fn send_command(&self, text: &str, suppress_expansion: bool) -> Result<(), HostError>;

    /// Show `text` in the default output area, unstyled.
    fn display_notice(&self, text: &str) -> Result<(), HostError>;

    fn reflex_find_by_name(
        &self,
        kind: ReflexKind,
        name: &str,
        case_sensitive: bool,
        include_disabled: bool,
    ) -> Result<Option<ReflexRef>, HostError>;

    /// Enable a reflex.  `None` is what a lookup miss produces; the host
    /// decides whether that is a no-op or an error.
    fn reflex_enable(&self, reflex: Option<&ReflexRef>) -> Result<(), HostError>;

    fn reflex_disable(&self, reflex: Option<&ReflexRef>) -> Result<(), HostError>;

    /// Look up a host variable.
    fn get_variable(&self, name: &str) -> Option<String>;

    /// Diagnostic console; receives Lua `print` output.
    fn console(&self, line: &str) {
        info!(target: "mudlexus::lua", "{line}");
    }
}

// ── ConsoleHost ───────────────────────────────────────────────────────────────

/// A standalone host that writes to a stream and keeps its reflexes and
/// variables in memory.
///
/// Literal sends are written as `> text`, expanding sends as `>> text`, and
/// notices as the bare text.
pub struct ConsoleHost<W: Write> {
    out: RefCell<W>,
    vars: VarStore,
    reflexes: RefCell<ReflexStore>,
}

impl<W: Write> ConsoleHost<W> {
    pub fn new(out: W, vars: VarStore, reflexes: ReflexStore) -> Self {
        Self {
            out: RefCell::new(out),
            vars,
            reflexes: RefCell::new(reflexes),
        }
    }

    /// Borrow the output stream (e.g. to inspect a `Vec<u8>` in tests).
    pub fn with_output<R>(&self, f: impl FnOnce(&W) -> R) -> R {
        f(&self.out.borrow())
    }

    /// Borrow the reflex registry.
    pub fn with_reflexes<R>(&self, f: impl FnOnce(&ReflexStore) -> R) -> R {
        f(&self.reflexes.borrow())
    }

    fn write_line(&self, line: &str) -> Result<(), HostError> {
        let mut out = self.out.borrow_mut();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }

    fn set_enabled(&self, reflex: Option<&ReflexRef>, enabled: bool) -> Result<(), HostError> {
        let Some(reflex) = reflex else {
            debug!(enabled, "reflex toggle with no reflex; ignored");
            return Ok(());
        };
        if self.reflexes.borrow_mut().set_enabled(reflex, enabled) {
            debug!(kind = %reflex.kind, id = reflex.id, enabled, "reflex toggled");
            Ok(())
        } else {
            Err(HostError::StaleReflex(reflex.clone()))
        }
    }
}

impl<W: Write> Host for ConsoleHost<W> {
    fn send_command(&self, text: &str, suppress_expansion: bool) -> Result<(), HostError> {
        debug!(text, suppress_expansion, "send_command");
        let marker = if suppress_expansion { ">" } else { ">>" };
        self.write_line(&format!("{marker} {text}"))
    }

    fn display_notice(&self, text: &str) -> Result<(), HostError> {
        debug!(text, "display_notice");
        self.write_line(text)
    }

    fn reflex_find_by_name(
        &self,
        kind: ReflexKind,
        name: &str,
        case_sensitive: bool,
        include_disabled: bool,
    ) -> Result<Option<ReflexRef>, HostError> {
        let found = self
            .reflexes
            .borrow()
            .find_by_name(kind, name, case_sensitive, include_disabled);
        debug!(%kind, name, found = found.is_some(), "reflex_find_by_name");
        Ok(found)
    }

    fn reflex_enable(&self, reflex: Option<&ReflexRef>) -> Result<(), HostError> {
        self.set_enabled(reflex, true)
    }

    fn reflex_disable(&self, reflex: Option<&ReflexRef>) -> Result<(), HostError> {
        self.set_enabled(reflex, false)
    }

    fn get_variable(&self, name: &str) -> Option<String> {
        self.vars.get(name).map(str::to_owned)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
