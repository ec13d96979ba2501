//! Declarative configuration documents (`tack.ini` and generated layers).
//!
//! ```ini
//! [project]
//! default_target = app
//! disable_auto_tools = no
//!
//! [target "tool:gen"]
//! src = extras/gen
//! bin = gen
//! defines = GEN_FAST=1; VERBOSE
//! core = yes
//! ```
//!
//! Parsing never fails: malformed headers, lines without `=` and unknown
//! keys are skipped.

use super::TargetOverride;
use crate::graph::{TargetAction, TargetDef};
use std::fs;
use std::io;
use std::path::Path;

/// Settings from the `[project]` section. `None` means "not set here".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    pub default_target: Option<String>,
    pub disable_auto_tools: Option<bool>,
}

/// Everything one document says about a target. Repeated sections with the
/// same name merge into one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TargetSection {
    pub name: String,
    pub src: Option<String>,
    pub bin: Option<String>,
    pub id: Option<String>,
    pub enabled: Option<bool>,
    pub remove: Option<bool>,
    pub core: Option<bool>,
    pub includes: Vec<String>,
    pub defines: Vec<String>,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub libs: Vec<String>,
}

impl TargetSection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn has_identity(&self) -> bool {
        self.src.is_some() || self.bin.is_some() || self.id.is_some()
    }

    /// The graph change this section asks for. Without `src`, `bin` or `id`
    /// it is an enable/disable of an existing target, and an unset
    /// `enabled` means enable: a flags-only section revives a target that
    /// a lower layer disabled.
    pub fn to_def(&self) -> TargetDef {
        if self.remove == Some(true) {
            return TargetDef::Action {
                name: self.name.clone(),
                action: TargetAction::Remove,
            };
        }

        let enabled = self.enabled.unwrap_or(true);
        if self.has_identity() {
            return TargetDef::Upsert {
                name: self.name.clone(),
                src_dir: self.src.clone(),
                bin_base: self.bin.clone(),
                id: self.id.clone(),
                enabled,
            };
        }

        TargetDef::Action {
            name: self.name.clone(),
            action: if enabled {
                TargetAction::Enable
            } else {
                TargetAction::Disable
            },
        }
    }

    /// The override record, when any flag list is non-empty or `core` is set.
    pub fn to_override(&self) -> Option<TargetOverride> {
        let lists = [
            &self.includes,
            &self.defines,
            &self.cflags,
            &self.ldflags,
            &self.libs,
        ];
        if self.core.is_none() && lists.iter().all(|l| l.is_empty()) {
            return None;
        }

        Some(TargetOverride {
            includes: self.includes.clone(),
            defines: self.defines.clone(),
            cflags: self.cflags.clone(),
            ldflags: self.ldflags.clone(),
            libs: self.libs.clone(),
            use_core: self.core.unwrap_or(false),
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IniDocument {
    pub project: ProjectSettings,
    /// In order of first appearance.
    pub targets: Vec<TargetSection>,
}

#[derive(Clone, Copy)]
enum Section {
    None,
    Project,
    Target(usize),
}

impl IniDocument {
    pub fn load(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    pub fn parse(text: &str) -> Self {
        let mut doc = IniDocument::default();
        let mut section = Section::None;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let Some((inner, _)) = header.split_once(']') else {
                    continue;
                };
                section = match parse_header(inner.trim()) {
                    Some(Header::Project) => Section::Project,
                    Some(Header::Target(name)) => Section::Target(doc.target_index(name)),
                    None => Section::None,
                };
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match section {
                Section::None => {}
                Section::Project => doc.apply_project_key(&key, value),
                Section::Target(idx) => apply_target_key(&mut doc.targets[idx], &key, value),
            }
        }

        doc
    }

    fn target_index(&mut self, name: &str) -> usize {
        if let Some(idx) = self.targets.iter().position(|t| t.name == name) {
            return idx;
        }
        self.targets.push(TargetSection::new(name));
        self.targets.len() - 1
    }

    fn apply_project_key(&mut self, key: &str, value: &str) {
        match key {
            "default_target" => self.project.default_target = Some(value.to_string()),
            "disable_auto_tools" => {
                if let Some(b) = parse_bool(value) {
                    self.project.disable_auto_tools = Some(b);
                }
            }
            _ => {}
        }
    }

    pub fn target(&self, name: &str) -> Option<&TargetSection> {
        self.targets.iter().find(|t| t.name == name)
    }
}

enum Header<'a> {
    Project,
    Target(&'a str),
}

fn parse_header(inner: &str) -> Option<Header<'_>> {
    if inner.eq_ignore_ascii_case("project") {
        return Some(Header::Project);
    }

    let keyword = inner.get(..6)?;
    if !keyword.eq_ignore_ascii_case("target") {
        return None;
    }
    let rest = &inner[6..];
    if !rest.is_empty() && !rest.starts_with(|c: char| c.is_whitespace() || c == '"') {
        return None;
    }

    let rest = rest.trim();
    let name = match rest.strip_prefix('"') {
        Some(quoted) => quoted.split_once('"')?.0,
        None => rest,
    };
    (!name.is_empty()).then_some(Header::Target(name))
}

fn apply_target_key(t: &mut TargetSection, key: &str, value: &str) {
    match key {
        "src" => t.src = Some(value.to_string()),
        "bin" => t.bin = Some(value.to_string()),
        "id" => t.id = Some(value.to_string()),
        "enabled" => t.enabled = parse_bool(value).or(t.enabled),
        "remove" => t.remove = parse_bool(value).or(t.remove),
        "core" => t.core = parse_bool(value).or(t.core),
        "includes" => t.includes = split_list(value),
        "defines" => t.defines = split_list(value),
        "cflags" => t.cflags = split_list(value),
        "ldflags" => t.ldflags = split_list(value),
        "libs" => t.libs = split_list(value),
        _ => {}
    }
}

/// Accepts 1/0, yes/no, true/false, on/off in any case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// `a; b ;;c` => `["a", "b", "c"]`
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
