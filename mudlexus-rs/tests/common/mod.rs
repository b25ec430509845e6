//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use mudlexus::bootstrap::{AssetLoader, AssetUrl, LoadError};
use mudlexus::host::{Host, HostError};
use mudlexus::lua::LuaRuntime;
use mudlexus::reflex::{ReflexKind, ReflexRef, ReflexStore};
use mudlexus::shim;
use mudlexus::var::VarStore;

// ── RecordingHost ─────────────────────────────────────────────────────────────

/// One host primitive invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send { text: String, suppress_expansion: bool },
    Notice(String),
    Find { kind: ReflexKind, name: String, case_sensitive: bool, include_disabled: bool },
    Enable(Option<ReflexRef>),
    Disable(Option<ReflexRef>),
    Console(String),
}

/// Records every primitive call in order.  Lookups are answered from
/// `reflexes`; toggles never change anything.
#[derive(Default)]
pub struct RecordingHost {
    calls: RefCell<Vec<Call>>,
    pub vars: VarStore,
    pub reflexes: ReflexStore,
    /// Make enable/disable of a missing reflex a host error.
    pub strict: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.set(name, value);
        self
    }

    /// Every call so far, leaving the log empty.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    /// Calls other than console output.
    pub fn take_host_calls(&self) -> Vec<Call> {
        self.take_calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Console(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn toggle(&self, reflex: Option<&ReflexRef>) -> Result<(), HostError> {
        if reflex.is_none() && self.strict {
            return Err(HostError::Io(std::io::Error::other("no such reflex")));
        }
        Ok(())
    }
}

impl Host for RecordingHost {
    fn send_command(&self, text: &str, suppress_expansion: bool) -> Result<(), HostError> {
        self.record(Call::Send { text: text.to_owned(), suppress_expansion });
        Ok(())
    }

    fn display_notice(&self, text: &str) -> Result<(), HostError> {
        self.record(Call::Notice(text.to_owned()));
        Ok(())
    }

    fn reflex_find_by_name(
        &self,
        kind: ReflexKind,
        name: &str,
        case_sensitive: bool,
        include_disabled: bool,
    ) -> Result<Option<ReflexRef>, HostError> {
        self.record(Call::Find {
            kind,
            name: name.to_owned(),
            case_sensitive,
            include_disabled,
        });
        Ok(self.reflexes.find_by_name(kind, name, case_sensitive, include_disabled))
    }

    fn reflex_enable(&self, reflex: Option<&ReflexRef>) -> Result<(), HostError> {
        self.record(Call::Enable(reflex.cloned()));
        self.toggle(reflex)
    }

    fn reflex_disable(&self, reflex: Option<&ReflexRef>) -> Result<(), HostError> {
        self.record(Call::Disable(reflex.cloned()));
        self.toggle(reflex)
    }

    fn get_variable(&self, name: &str) -> Option<String> {
        self.vars.get(name).map(str::to_owned)
    }

    fn console(&self, line: &str) {
        self.record(Call::Console(line.to_owned()));
    }
}

/// A runtime bridged to `host` with the bundled layer installed.
pub fn shimmed(host: RecordingHost) -> (LuaRuntime, Rc<RecordingHost>) {
    let host = Rc::new(host);
    let dyn_host: Rc<dyn Host> = host.clone();
    let rt = LuaRuntime::new(dyn_host).expect("runtime");
    shim::install(&rt).expect("install shim");
    (rt, host)
}

pub fn send(text: &str) -> Call {
    Call::Send { text: text.to_owned(), suppress_expansion: true }
}

pub fn expand(text: &str) -> Call {
    Call::Send { text: text.to_owned(), suppress_expansion: false }
}

// ── FakeLoader ────────────────────────────────────────────────────────────────

/// Serves a fixed source (or fails) and remembers every URL requested.
pub struct FakeLoader {
    source: Option<String>,
    pub fetched: RefCell<Vec<AssetUrl>>,
}

impl FakeLoader {
    pub fn serving(source: &str) -> Self {
        Self { source: Some(source.to_owned()), fetched: RefCell::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { source: None, fetched: RefCell::new(Vec::new()) }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.borrow().len()
    }
}

impl AssetLoader for FakeLoader {
    async fn fetch(&self, url: &AssetUrl) -> Result<String, LoadError> {
        self.fetched.borrow_mut().push(url.clone());
        self.source
            .clone()
            .ok_or_else(|| LoadError::NotFound(url.to_string()))
    }
}
