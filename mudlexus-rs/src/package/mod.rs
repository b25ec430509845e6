//! Package conversion between Mudlet, Nexus, and an editable directory tree.
//!
//! | Input              | Tool                                   | Output                    |
//! |--------------------|----------------------------------------|---------------------------|
//! | Mudlet `.xml`      | [`MudletExtractor`]                    | `name.json` + `name.js`   |
//! | Nexus `.nxs`       | [`NxsExtractor`]                       | `name_type.json` + `.js`  |
//! | directory tree     | [`NxsCompiler`]                        | `{package}.nxs`           |
//!
//! Every reflex becomes one JSON file.  Its script, when it has one, is
//! written beside it as a `.js` file wrapped in `(function() { ... })()` so
//! it can be edited as plain code; the compiler reads the wrapper back off.
//! Scripts extracted from Mudlet are wrapped again in `lua.execute(...)` so
//! that Nexus hands them to the Mudlet shim.
//!
//! Subdirectories map to groups.  A file name that is already taken gets a
//! number: `rest.json`, `rest.1.json`, `rest.2.json`, ...

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{NoExpand, Regex};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;

pub mod mudlet;
pub mod nexus;

pub use mudlet::MudletExtractor;
pub use nexus::{NxsCompiler, NxsExtractor};

/// Optional load hook picked up from the working directory by [`extract`].
pub const ON_LOAD_SCRIPT: &str = "onLoad.js";

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("{} already exists (use -o to overwrite)", .0.display())]
    TargetExists(PathBuf),

    #[error("cannot access {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("not a Mudlet package (root element is <{0}>)")]
    NotMudletPackage(String),

    #[error("{}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("malformed package: {0}")]
    Malformed(String),

    #[error("don't know how to extract {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PackageError + '_ {
    move |source| PackageError::Io { path: path.to_path_buf(), source }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Extract `package` into `target`, choosing the format by extension.
///
/// A Mudlet extraction also installs `./onLoad.js` into the tree when it
/// exists.
pub fn extract(package: &Path, target: &Path, overwrite: bool) -> Result<(), PackageError> {
    match package.extension().and_then(|e| e.to_str()) {
        Some("xml") => MudletExtractor::new(overwrite)
            .with_on_load(ON_LOAD_SCRIPT)
            .extract_file(package, target),
        Some("nxs") => NxsExtractor::new(overwrite).extract_file(package, target),
        _ => Err(PackageError::UnknownFormat(package.to_path_buf())),
    }
}

// ── Output tree helpers ───────────────────────────────────────────────────────

/// Directories created by one extraction run.
///
/// A directory that already exists is an error unless `overwrite` is set,
/// in which case it is emptied first.  Directories created earlier in the
/// same run are reused, so two groups with one name share a directory.
#[derive(Debug, Default)]
pub(crate) struct OutputDirs {
    overwrite: bool,
    created: HashSet<PathBuf>,
}

impl OutputDirs {
    pub(crate) fn new(overwrite: bool) -> Self {
        Self { overwrite, created: HashSet::new() }
    }

    pub(crate) fn ensure(&mut self, dir: &Path) -> Result<(), PackageError> {
        if self.created.contains(dir) {
            return Ok(());
        }
        if dir.exists() {
            if !self.overwrite {
                return Err(PackageError::TargetExists(dir.to_path_buf()));
            }
            fs::remove_dir_all(dir).map_err(io_error(dir))?;
        }
        fs::create_dir_all(dir).map_err(io_error(dir))?;
        self.created.insert(dir.to_path_buf());
        Ok(())
    }
}

fn numbered_json() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.?[\d+]*\.json$").expect("static regex"))
}

/// `filename`, or the first numbered variant of it not yet present in `dir`.
pub fn next_available_filename(dir: &Path, filename: &str) -> String {
    let mut candidate = filename.to_owned();
    let mut n = 1;
    while dir.join(&candidate).exists() {
        let suffix = format!(".{n}.json");
        candidate = numbered_json()
            .replace(&candidate, NoExpand(&suffix))
            .into_owned();
        n += 1;
    }
    candidate
}

/// Make a reflex or group name usable as one path component.
pub fn path_component(name: &str) -> String {
    let name = name.replace('/', "Slash").replace('\\', "Backslash");
    match name.as_str() {
        "" => "Unnamed".to_owned(),
        "." | ".." => name.replace('.', "Dot"),
        _ => name,
    }
}

/// `rest.json` → `rest.js`
pub(crate) fn script_file(json_file: &str) -> String {
    match json_file.strip_suffix(".json") {
        Some(stem) => format!("{stem}.js"),
        None => format!("{json_file}.js"),
    }
}

/// Wrap `code` as an immediately-invoked function.
pub fn wrap_js(code: &str) -> String {
    format!("(function() {{\n{code}\n}})()\n")
}

/// Inverse of [`wrap_js`]: drop the first and last lines.
pub fn unwrap_js(source: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    match lines.len() {
        0..=2 => String::new(),
        n => lines[1..n - 1].join("\n"),
    }
}

/// Write `value` as JSON indented by four spaces.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PackageError> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    {
        let mut ser =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        value
            .serialize(&mut ser)
            .map_err(|source| PackageError::Json { path: path.to_path_buf(), source })?;
    }
    writer.flush().map_err(io_error(path))
}

pub(crate) fn write_text(path: &Path, text: &str) -> Result<(), PackageError> {
    fs::write(path, text).map_err(io_error(path))
}

pub(crate) fn read_text(path: &Path) -> Result<String, PackageError> {
    fs::read_to_string(path).map_err(io_error(path))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
