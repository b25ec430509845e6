//! Mudlet XML package extraction.
//!
//! Walks the `AliasPackage`, `KeyPackage`, `ScriptPackage`, `TimerPackage`
//! and `TriggerPackage` sections.  Items of a top-level group land directly
//! in the target directory; nested groups become subdirectories.  Group
//! nodes themselves are not written.
//!
//! A trigger with several patterns becomes one node per pattern.  A
//! multiline trigger keeps a single pattern and is skipped, with a warning,
//! when it has more than one regex pattern.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::{
    io_error, next_available_filename, path_component, read_text, script_file, wrap_js,
    write_json, write_text, OutputDirs, PackageError,
};

const SECTIONS: &[&str] = &[
    "AliasPackage",
    "KeyPackage",
    "ScriptPackage",
    "TimerPackage",
    "TriggerPackage",
];

// ── Node model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptAction {
    pub action: String,
    pub script: String,
}

/// One extracted reflex, as written to `{name}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ScriptAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_modifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching: Option<String>,
}

impl NodeInfo {
    /// The node's script, if it has a non-empty one.
    pub fn script(&self) -> Option<&str> {
        self.actions
            .first()
            .map(|a| a.script.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Nexus matching mode for a Mudlet `regexCodePropertyList` entry.
pub fn pattern_kind(code: &str) -> Option<&'static str> {
    Some(match code.trim() {
        "0" | "2" => "substring",
        "1" => "regexp",
        "3" => "exact",
        "4" => "lua function",
        "5" => "line spacer",
        "6" => "color trigger",
        "7" => "prompt",
        _ => return None,
    })
}

// ── Script rewriting ──────────────────────────────────────────────────────────

fn matches_ref() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(multi)?matches\[?[\d+]?\]?\[(\d+)\]").expect("static regex")
    })
}

/// Point Mudlet capture references (`matches[2]`, `multimatches[1][2]`) at
/// the Nexus trigger arguments.
pub fn rewrite_matches(script: &str) -> String {
    matches_ref()
        .replace_all(script, "js.global.args[${2}]")
        .into_owned()
}

/// JS statement that runs a Mudlet Lua script through the shim.
///
/// The script goes inside a template literal, so backslashes, backticks and
/// `${` are escaped to reach Lua unchanged.
pub fn lua_execute_js(script: &str) -> String {
    let escaped = rewrite_matches(script)
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${");
    format!("lua.execute(`{escaped}`)")
}

// ── XML helpers ───────────────────────────────────────────────────────────────

fn elements<'a, 'input: 'a>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn child<'a, 'input: 'a>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == tag)
}

/// Text of the first `tag` child; an empty element reads as `""`.
fn child_text<'a, 'input: 'a>(node: Node<'a, 'input>, tag: &str) -> Option<&'a str> {
    child(node, tag).map(|c| c.text().unwrap_or_default())
}

/// `(pattern, matching mode)` pairs of a trigger, in order.
fn trigger_patterns(node: Node<'_, '_>) -> Vec<(String, &'static str)> {
    let texts = child(node, "regexCodeList")
        .into_iter()
        .flat_map(elements)
        .map(|n| n.text().unwrap_or_default().to_owned());
    let codes = child(node, "regexCodePropertyList")
        .into_iter()
        .flat_map(elements)
        .map(|n| n.text().unwrap_or_default());

    texts
        .zip(codes)
        .filter_map(|(text, code)| match pattern_kind(code) {
            Some(kind) => Some((text, kind)),
            None => {
                warn!(code, pattern = %text, "unknown trigger pattern type; pattern skipped");
                None
            }
        })
        .collect()
}

// ── Extractor ─────────────────────────────────────────────────────────────────

/// Extracts a Mudlet XML package into a directory tree.
pub struct MudletExtractor {
    dirs: OutputDirs,
    on_load: Option<PathBuf>,
    unknowns: u32,
}

impl MudletExtractor {
    pub fn new(overwrite: bool) -> Self {
        Self { dirs: OutputDirs::new(overwrite), on_load: None, unknowns: 1 }
    }

    /// Install this script as the package's `onLoad` function, if it exists.
    pub fn with_on_load(mut self, path: impl Into<PathBuf>) -> Self {
        self.on_load = Some(path.into());
        self
    }

    pub fn extract_file(&mut self, package: &Path, target: &Path) -> Result<(), PackageError> {
        let xml = read_text(package)?;
        self.extract_str(&xml, target)
    }

    pub fn extract_str(&mut self, xml: &str, target: &Path) -> Result<(), PackageError> {
        let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
        let doc = Document::parse_with_options(xml, options)?;
        let root = doc.root_element();
        if root.tag_name().name() != "MudletPackage" {
            return Err(PackageError::NotMudletPackage(root.tag_name().name().to_owned()));
        }
        info!(
            version = root.attribute("version").unwrap_or("unknown"),
            "parsing Mudlet package"
        );

        self.dirs.ensure(target)?;
        for tag in SECTIONS {
            if let Some(section) = child(root, tag) {
                for node in elements(section) {
                    self.extract_section(node, target)?;
                }
            }
        }

        if let Some(on_load) = self.on_load.clone().filter(|p| p.is_file()) {
            write_json(
                &target.join("onLoad.json"),
                &json!({ "type": "function", "name": "onLoad", "enabled": true, "code": "" }),
            )?;
            let dest = target.join("onLoad.js");
            std::fs::copy(&on_load, &dest).map_err(io_error(&dest))?;
        }
        Ok(())
    }

    fn extract_section(&mut self, node: Node<'_, '_>, dir: &Path) -> Result<(), PackageError> {
        self.dirs.ensure(dir)?;
        let tag = node.tag_name().name();
        let Some(leaf) = tag.strip_suffix("Group") else {
            return self.write_node(node, dir);
        };

        for item in elements(node).filter(|n| n.tag_name().name() == leaf) {
            self.write_node(item, dir)?;
        }
        for group in elements(node).filter(|n| n.tag_name().name() == tag) {
            let name = self.node_name(group);
            self.extract_section(group, &dir.join(path_component(&name)))?;
        }
        Ok(())
    }

    fn node_name(&mut self, node: Node<'_, '_>) -> String {
        let name = match child_text(node, "name").filter(|n| !n.is_empty()) {
            Some(name) => name.to_owned(),
            None => {
                let name = format!("Unknown {} {}", node.tag_name().name(), self.unknowns);
                self.unknowns += 1;
                name
            }
        };
        name.replace('/', "Slash").replace('\\', "Backslash")
    }

    /// The nodes one XML element expands to; empty when it is skipped.
    pub fn node_infos(&mut self, node: Node<'_, '_>) -> Vec<NodeInfo> {
        let tag = node.tag_name().name();
        let text_of = |name: &str| child_text(node, name).map(str::to_owned);

        let mut info = NodeInfo {
            enabled: node.attribute("isActive") == Some("yes"),
            kind: tag.to_lowercase(),
            name: self.node_name(node),
            actions: child_text(node, "script")
                .map(|script| {
                    vec![ScriptAction { action: "script".to_owned(), script: script.to_owned() }]
                })
                .unwrap_or_default(),
            command: text_of("command"),
            text: text_of("regex"),
            key_code: text_of("keyCode"),
            key_modifier: text_of("keyModifier"),
            time: text_of("time"),
            matching: None,
        };
        if tag != "Trigger" {
            return vec![info];
        }

        let patterns = trigger_patterns(node);
        if node.attribute("isMultiline") == Some("yes") {
            let regexes: Vec<&(String, &str)> =
                patterns.iter().filter(|(_, kind)| *kind == "regexp").collect();
            if regexes.len() > 1 {
                let texts: Vec<&str> = regexes.iter().map(|(text, _)| text.as_str()).collect();
                warn!(
                    trigger = %info.name,
                    patterns = ?texts,
                    "manual rewrite needed: multiline trigger with several regex patterns; skipped"
                );
                return Vec::new();
            }
            if let Some((text, kind)) = regexes.first().copied().or(patterns.first()) {
                info.text = Some(text.clone());
                info.matching = Some((*kind).to_owned());
            }
            return vec![info];
        }

        if patterns.is_empty() {
            warn!(trigger = %info.name, "trigger has no patterns; skipped");
        }
        patterns
            .into_iter()
            .map(|(text, kind)| NodeInfo {
                text: Some(text),
                matching: Some(kind.to_owned()),
                ..info.clone()
            })
            .collect()
    }

    fn write_node(&mut self, node: Node<'_, '_>, dir: &Path) -> Result<(), PackageError> {
        for info in self.node_infos(node) {
            let file = next_available_filename(dir, &format!("{}.json", path_component(&info.name)));
            write_json(&dir.join(&file), &info)?;
            if let Some(script) = info.script() {
                write_text(&dir.join(script_file(&file)), &wrap_js(&lua_execute_js(script)))?;
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
