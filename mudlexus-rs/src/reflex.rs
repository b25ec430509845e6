//! Reflexes: the host's named automation objects.
//!
//! A reflex is an alias, a keybind, or a trigger.  The shim never inspects a
//! reflex directly; it asks the host to look one up by kind and name, then
//! hands the resulting [`ReflexRef`] straight back to the host to enable or
//! disable it.
//!
//! [`ReflexStore`] is an in-memory registry used by
//! [`ConsoleHost`](crate::host::ConsoleHost) and by tests.

use std::fmt;
use std::str::FromStr;

// ── ReflexKind ────────────────────────────────────────────────────────────────

/// The kind of a reflex, as named by `reflex_find_by_name`'s first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReflexKind {
    Alias,
    Keybind,
    Trigger,
}

impl ReflexKind {
    pub const ALL: &'static [ReflexKind] =
        &[ReflexKind::Alias, ReflexKind::Keybind, ReflexKind::Trigger];

    /// The lowercase name used by the host API (e.g. `"keybind"`).
    pub fn name(self) -> &'static str {
        match self {
            ReflexKind::Alias => "alias",
            ReflexKind::Keybind => "keybind",
            ReflexKind::Trigger => "trigger",
        }
    }
}

impl fmt::Display for ReflexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no reflex kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReflexKind(pub String);

impl fmt::Display for UnknownReflexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reflex kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownReflexKind {}

impl FromStr for ReflexKind {
    type Err = UnknownReflexKind;

    /// Exact match only; the host API names kinds in lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReflexKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownReflexKind(s.to_owned()))
    }
}

// ── ReflexRef ─────────────────────────────────────────────────────────────────

/// Opaque handle to a reflex, produced by a host lookup.
///
/// Only the host that issued a handle knows what `id` means.  Handles are
/// consumed immediately by enable/disable and never stored by the shim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReflexRef {
    pub kind: ReflexKind,
    pub id: u32,
}

impl ReflexRef {
    pub fn new(kind: ReflexKind, id: u32) -> Self {
        Self { kind, id }
    }
}

// ── Reflex / ReflexStore ──────────────────────────────────────────────────────

/// A registered reflex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reflex {
    pub id: u32,
    pub kind: ReflexKind,
    pub name: String,
    pub enabled: bool,
}

/// In-memory reflex registry, searched in registration order.
#[derive(Debug)]
pub struct ReflexStore {
    reflexes: Vec<Reflex>,
    next_id: u32,
}

impl Default for ReflexStore {
    fn default() -> Self {
        Self { reflexes: Vec::new(), next_id: 1 }
    }
}

impl ReflexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reflex and return a handle to it.
    ///
    /// Duplicate names are legal; lookups return the earliest match.
    pub fn add(&mut self, kind: ReflexKind, name: impl Into<String>, enabled: bool) -> ReflexRef {
        let id = self.next_id;
        self.next_id += 1;
        self.reflexes.push(Reflex { id, kind, name: name.into(), enabled });
        ReflexRef::new(kind, id)
    }

    /// Find the first reflex of `kind` called `name`.
    ///
    /// `case_sensitive == false` compares names with Unicode lowercasing.
    /// Disabled reflexes are skipped unless `include_disabled` is set.
    pub fn find_by_name(
        &self,
        kind: ReflexKind,
        name: &str,
        case_sensitive: bool,
        include_disabled: bool,
    ) -> Option<ReflexRef> {
        let folded = (!case_sensitive).then(|| name.to_lowercase());
        self.reflexes
            .iter()
            .filter(|r| r.kind == kind)
            .filter(|r| include_disabled || r.enabled)
            .find(|r| match &folded {
                Some(lower) => r.name.to_lowercase() == *lower,
                None => r.name == name,
            })
            .map(|r| ReflexRef::new(r.kind, r.id))
    }

    pub fn get(&self, reflex: &ReflexRef) -> Option<&Reflex> {
        self.reflexes
            .iter()
            .find(|r| r.id == reflex.id && r.kind == reflex.kind)
    }

    /// Set the enabled flag.  Returns `false` if the handle is stale.
    pub fn set_enabled(&mut self, reflex: &ReflexRef, enabled: bool) -> bool {
        match self
            .reflexes
            .iter_mut()
            .find(|r| r.id == reflex.id && r.kind == reflex.kind)
        {
            Some(r) => {
                r.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reflex> {
        self.reflexes.iter()
    }

    pub fn len(&self) -> usize {
        self.reflexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reflexes.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_roundtrip() {
        for &k in ReflexKind::ALL {
            assert_eq!(k.name().parse::<ReflexKind>(), Ok(k));
        }
    }

    #[test]
    fn unknown_kind_is_error() {
        let err = "timer".parse::<ReflexKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown reflex kind 'timer'");
        assert!("Alias".parse::<ReflexKind>().is_err());
    }

    #[test]
    fn find_case_insensitive() {
        let mut store = ReflexStore::new();
        let r = store.add(ReflexKind::Alias, "Rest", true);
        assert_eq!(store.find_by_name(ReflexKind::Alias, "rest", false, false), Some(r));
        assert_eq!(store.find_by_name(ReflexKind::Alias, "rest", true, false), None);
        assert!(store.find_by_name(ReflexKind::Alias, "Rest", true, false).is_some());
    }

    #[test]
    fn find_respects_kind() {
        let mut store = ReflexStore::new();
        store.add(ReflexKind::Trigger, "rest", true);
        assert!(store.find_by_name(ReflexKind::Alias, "rest", false, true).is_none());
        assert!(store.find_by_name(ReflexKind::Trigger, "rest", false, true).is_some());
    }

    #[test]
    fn disabled_hidden_unless_included() {
        let mut store = ReflexStore::new();
        let r = store.add(ReflexKind::Keybind, "F1", false);
        assert!(store.find_by_name(ReflexKind::Keybind, "f1", false, false).is_none());
        assert_eq!(store.find_by_name(ReflexKind::Keybind, "f1", false, true), Some(r));
    }

    #[test]
    fn first_registered_wins() {
        let mut store = ReflexStore::new();
        let first = store.add(ReflexKind::Alias, "go", true);
        store.add(ReflexKind::Alias, "GO", true);
        assert_eq!(store.find_by_name(ReflexKind::Alias, "go", false, false), Some(first));
    }

    #[test]
    fn set_enabled_toggles() {
        let mut store = ReflexStore::new();
        let r = store.add(ReflexKind::Trigger, "autoloot", true);
        assert!(store.set_enabled(&r, false));
        assert!(!store.get(&r).unwrap().enabled);
        assert!(store.set_enabled(&r, true));
        assert!(store.get(&r).unwrap().enabled);
    }

    #[test]
    fn stale_handle_is_rejected() {
        let mut store = ReflexStore::new();
        assert!(!store.set_enabled(&ReflexRef::new(ReflexKind::Alias, 99), true));
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }
}
