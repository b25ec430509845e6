//! Nexus `.nxs` packages: extraction to a directory tree and compilation
//! back.
//!
//! An `.nxs` file is JSON: a root group whose `items` are reflexes or
//! nested groups.  Extraction writes each reflex as `{name}_{type}.json`
//! (or `{type}{id}.json` when unnamed) and its code as a sibling `.js`.
//! Compilation walks a tree, folds any `.js` edits back into the JSON, and
//! numbers every group and item that has no `id` yet.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use serde_json::{json, Value};
use tracing::debug;
use walkdir::WalkDir;

use super::{
    next_available_filename, path_component, read_text, script_file, unwrap_js, wrap_js,
    write_json, write_text, OutputDirs, PackageError,
};

fn str_field<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn items_of(item: &Value) -> &[Value] {
    item.get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// An item's code: `code` when set, else the first non-empty action script.
pub fn item_code(item: &Value) -> Option<&str> {
    item.get("code")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .or_else(|| {
            item.get("actions")?
                .as_array()?
                .iter()
                .filter_map(|a| a.get("script")?.as_str())
                .find(|s| !s.is_empty())
        })
}

fn item_filename(item: &Value) -> String {
    let kind = str_field(item, "type");
    match str_field(item, "name") {
        "" => {
            let id = match item.get("id") {
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::String(s)) => s.clone(),
                _ => String::new(),
            };
            format!("{kind}{id}.json")
        }
        name => format!("{name}_{kind}.json"),
    }
}

// ── Extractor ─────────────────────────────────────────────────────────────────

/// Extracts an `.nxs` package into a directory tree.
pub struct NxsExtractor {
    dirs: OutputDirs,
}

impl NxsExtractor {
    pub fn new(overwrite: bool) -> Self {
        Self { dirs: OutputDirs::new(overwrite) }
    }

    pub fn extract_file(&mut self, package: &Path, target: &Path) -> Result<(), PackageError> {
        let text = read_text(package)?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|source| PackageError::Json { path: package.to_path_buf(), source })?;
        self.extract(&value, target)
    }

    pub fn extract(&mut self, package: &Value, target: &Path) -> Result<(), PackageError> {
        let items = package
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| PackageError::Malformed("package has no 'items' list".to_owned()))?;
        self.extract_items(items, target)
    }

    fn extract_items(&mut self, items: &[Value], dir: &Path) -> Result<(), PackageError> {
        self.dirs.ensure(dir)?;
        for item in items {
            if str_field(item, "type") == "group" {
                let sub = dir.join(path_component(str_field(item, "name")));
                self.extract_items(items_of(item), &sub)?;
                continue;
            }

            let file = next_available_filename(dir, &path_component(&item_filename(item)));
            if let Some(code) = item_code(item) {
                write_text(&dir.join(script_file(&file)), &wrap_js(code))?;
            }
            write_json(&dir.join(&file), item)?;
        }
        Ok(())
    }
}

// ── Compiler ──────────────────────────────────────────────────────────────────

/// Compiles a directory tree into an `.nxs` package.
///
/// The package root is group `1`; new ids count up from `2` in walk order.
/// `description.txt` at the top of the tree becomes the package
/// description.
pub struct NxsCompiler {
    name: String,
    source: PathBuf,
}

impl NxsCompiler {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), source: source.into() }
    }

    /// Name the package after the source directory.
    pub fn from_dir(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let name = std::fs::canonicalize(&source)
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "package".to_owned());
        Self { name, source }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package_file(&self) -> String {
        format!("{}.nxs", self.name)
    }

    pub fn compile(&self) -> Result<Value, PackageError> {
        let mut items: Vec<Value> = Vec::new();
        let mut next_id: u64 = 2;

        for entry in WalkDir::new(&self.source).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension() != Some(OsStr::new("json")) {
                continue;
            }
            debug!(path = %path.display(), "adding package item");

            let mut data = read_item(path)?;
            let mut target = &mut items;
            for group in self.groups_for(path) {
                target = child_group(target, &group, &mut next_id)?;
            }
            if let Some(obj) = data.as_object_mut() {
                if !obj.contains_key("id") {
                    obj.insert("id".to_owned(), next_id.into());
                    next_id += 1;
                }
            }
            target.push(data);
        }

        let description = read_text(&self.source.join("description.txt")).unwrap_or_default();
        Ok(json!({
            "name": self.name,
            "id": 1,
            "enabled": true,
            "type": "group",
            "items": items,
            "description": description,
        }))
    }

    /// Compile and write `{name}.nxs` into `out_dir`.
    pub fn write(&self, out_dir: &Path) -> Result<PathBuf, PackageError> {
        let package = self.compile()?;
        let path = out_dir.join(self.package_file());
        write_json(&path, &package)?;
        Ok(path)
    }

    /// Group names from the source root down to `file`'s directory.
    fn groups_for(&self, file: &Path) -> Vec<String> {
        file.parent()
            .and_then(|dir| dir.strip_prefix(&self.source).ok())
            .map(|rel| {
                rel.components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Read one item, folding in the code from its sibling `.js` when present.
fn read_item(path: &Path) -> Result<Value, PackageError> {
    let mut data: Value = serde_json::from_str(&read_text(path)?)
        .map_err(|source| PackageError::Json { path: path.to_path_buf(), source })?;
    let Some(obj) = data.as_object_mut() else {
        return Err(PackageError::Malformed(format!("{}: not a JSON object", path.display())));
    };

    let js = path.with_extension("js");
    if js.is_file() {
        let code = Value::String(unwrap_js(&read_text(&js)?));
        if obj.contains_key("code") {
            obj.insert("code".to_owned(), code);
        } else if let Some(script) = obj
            .get_mut("actions")
            .and_then(Value::as_array_mut)
            .and_then(|actions| actions.iter_mut().find_map(|a| a.get_mut("script")))
        {
            *script = code;
        }
    }
    Ok(data)
}

/// The `items` of group `name` in `items`, creating the group if needed.
fn child_group<'a>(
    items: &'a mut Vec<Value>,
    name: &str,
    next_id: &mut u64,
) -> Result<&'a mut Vec<Value>, PackageError> {
    let index = match items
        .iter()
        .position(|i| i["name"] == name && i["type"] == "group")
    {
        Some(index) => index,
        None => {
            items.push(json!({
                "type": "group",
                "enabled": true,
                "id": *next_id,
                "name": name,
                "items": [],
                "actions": [],
            }));
            *next_id += 1;
            items.len() - 1
        }
    };

    let malformed = || PackageError::Malformed(format!("group '{name}' has no 'items' list"));
    let group = items[index].as_object_mut().ok_or_else(malformed)?;
    match group.entry("items").or_insert_with(|| Value::Array(Vec::new())) {
        Value::Array(children) => Ok(children),
        _ => Err(malformed()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
