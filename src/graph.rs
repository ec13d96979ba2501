//! The set of buildable targets for one invocation.
//!
//! Built from scratch every run: discovery from the directory layout first,
//! then every config layer's definitions in ascending priority.

use crate::config::Config;
use crate::layout::{Layout, sanitize_name_to_id};
use crate::scan;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// CLI-facing name, e.g. `tool:foo`.
    pub name: String,
    /// Filesystem-safe name used under `build/`.
    pub id: String,
    /// Project-relative source directory.
    pub src_dir: PathBuf,
    pub bin_base: String,
    pub enabled: bool,
}

impl Target {
    pub fn new(name: &str, src_dir: impl Into<PathBuf>, bin_base: &str) -> Self {
        Self {
            name: name.to_string(),
            id: sanitize_name_to_id(name),
            src_dir: src_dir.into(),
            bin_base: bin_base.to_string(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAction {
    Enable,
    Disable,
    Remove,
}

/// One change to the graph, as declared by a config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetDef {
    /// Create the target if needed, then set the given fields.
    Upsert {
        name: String,
        src_dir: Option<String>,
        bin_base: Option<String>,
        id: Option<String>,
        enabled: bool,
    },
    /// Only touches a target that already exists.
    Action { name: String, action: TargetAction },
}

impl TargetDef {
    pub fn name(&self) -> &str {
        match self {
            TargetDef::Upsert { name, .. } | TargetDef::Action { name, .. } => name,
        }
    }
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("targets '{first}' and '{second}' share the id '{id}'")]
    DuplicateId {
        id: String,
        first: String,
        second: String,
    },
}

#[derive(Debug, Default, Clone)]
pub struct TargetGraph {
    targets: Vec<Target>,
}

impl TargetGraph {
    /// Targets implied by the directory layout alone.
    pub fn discover(layout: &Layout, disable_auto_tools: bool) -> Self {
        let mut graph = Self::default();

        let app_src = if layout.app_dir().is_dir() {
            "src/app"
        } else {
            "src"
        };
        graph.push(Target::new("app", app_src, "app"));

        if !disable_auto_tools {
            for dir in scan::subdirs(&layout.tools_dir()) {
                let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                graph.push(Target::new(
                    &format!("tool:{name}"),
                    PathBuf::from("tools").join(name),
                    name,
                ));
            }
        }

        graph
    }

    /// Discovery plus every layer's definitions, validated.
    pub fn build(layout: &Layout, config: &Config) -> Result<Self, GraphError> {
        let mut graph = Self::discover(layout, config.disable_auto_tools());
        for layer in config.layers() {
            for def in &layer.defs {
                tracing::trace!(target_name = def.name(), source = %layer.source, "applying target def");
                graph.apply(def);
            }
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Insert or replace by name.
    pub fn push(&mut self, target: Target) {
        match self.targets.iter_mut().find(|t| t.name == target.name) {
            Some(existing) => *existing = target,
            None => self.targets.push(target),
        }
    }

    pub fn apply(&mut self, def: &TargetDef) {
        match def {
            TargetDef::Upsert {
                name,
                src_dir,
                bin_base,
                id,
                enabled,
            } => {
                let idx = match self.targets.iter().position(|t| &t.name == name) {
                    Some(idx) => idx,
                    None => {
                        self.targets.push(Target::new(name, "src", "app"));
                        self.targets.len() - 1
                    }
                };
                let target = &mut self.targets[idx];
                if let Some(src) = src_dir {
                    target.src_dir = PathBuf::from(src);
                }
                if let Some(bin) = bin_base {
                    target.bin_base = bin.clone();
                }
                if let Some(id) = id {
                    target.id = id.clone();
                }
                target.enabled = *enabled;
            }
            TargetDef::Action { name, action } => match action {
                TargetAction::Remove => self.targets.retain(|t| &t.name != name),
                TargetAction::Enable | TargetAction::Disable => {
                    if let Some(target) = self.targets.iter_mut().find(|t| &t.name == name) {
                        target.enabled = *action == TargetAction::Enable;
                    }
                }
            },
        }
    }

    /// No two enabled targets may share an id.
    pub fn validate(&self) -> Result<(), GraphError> {
        let enabled: Vec<&Target> = self.targets.iter().filter(|t| t.enabled).collect();
        for (i, a) in enabled.iter().enumerate() {
            if let Some(b) = enabled[i + 1..].iter().find(|b| b.id == a.id) {
                return Err(GraphError::DuplicateId {
                    id: a.id.clone(),
                    first: a.name.clone(),
                    second: b.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Enabled target with this name or id.
    pub fn find(&self, name_or_id: &str) -> Option<&Target> {
        self.targets
            .iter()
            .filter(|t| t.enabled)
            .find(|t| t.name == name_or_id || t.id == name_or_id)
    }

    /// Any target with this exact name, enabled or not.
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(|t| t.enabled)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
