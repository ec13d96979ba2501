//! Layered project configuration.
//!
//! Three layers, lowest priority first:
//!
//! 1. built-in defaults ([`defaults`])
//! 2. `tackfile.c`, turned into a document by [`bootstrap`]
//! 3. `tack.ini`, or the file given with `--config`
//!
//! Target definitions are applied in that order so later layers win. An
//! override record is taken whole from the highest layer that has one.

pub mod bootstrap;
pub mod defaults;
pub mod ini;

use crate::graph::TargetDef;
use crate::layout::Layout;
use crate::toolchain::Toolchain;
use bootstrap::{BootstrapError, TackfileGenerator};
use ini::{IniDocument, ProjectSettings, TargetSection};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Target used when neither the CLI nor any layer names one.
pub const DEFAULT_TARGET: &str = "app";

/// Extra compile/link inputs for one target.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TargetOverride {
    pub includes: Vec<String>,
    pub defines: Vec<String>,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub libs: Vec<String>,
    /// Link the shared core objects into this target.
    pub use_core: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSource {
    Defaults,
    /// Document generated from `tackfile.c`.
    Tackfile(PathBuf),
    /// `tack.ini` or an explicit `--config` file.
    Ini(PathBuf),
}

impl LayerSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            LayerSource::Defaults => None,
            LayerSource::Tackfile(p) | LayerSource::Ini(p) => Some(p),
        }
    }
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSource::Defaults => write!(f, "built-in defaults"),
            LayerSource::Tackfile(p) => write!(f, "tackfile.c ({})", p.display()),
            LayerSource::Ini(p) => write!(f, "{}", p.display()),
        }
    }
}

/// One source of configuration.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: LayerSource,
    pub settings: ProjectSettings,
    /// Graph changes, in document order.
    pub defs: Vec<TargetDef>,
    /// At most one record per target name.
    pub overrides: Vec<(String, TargetOverride)>,
}

impl ConfigLayer {
    pub fn from_document(source: LayerSource, doc: IniDocument) -> Self {
        let defs = doc.targets.iter().map(TargetSection::to_def).collect();
        let overrides = doc
            .targets
            .iter()
            .filter_map(|t| t.to_override().map(|ov| (t.name.clone(), ov)))
            .collect();

        Self {
            source,
            settings: doc.project,
            defs,
            overrides,
        }
    }

    pub fn override_for(&self, name: &str) -> Option<&TargetOverride> {
        self.overrides
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ov)| ov)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("tackfile.c: {0}")]
    Bootstrap(#[from] BootstrapError),
}

/// Process-boundary switches that shape loading.
#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    /// `--no-config`: only built-in defaults.
    pub no_config: bool,
    /// `--config PATH`: replaces `tack.ini` as the top layer.
    pub config_path: Option<PathBuf>,
    /// `--no-auto-tools`
    pub no_auto_tools: bool,
}

/// Why tool discovery is on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoTools {
    Enabled,
    DisabledByCli,
    DisabledByConfig,
}

/// The effective configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ascending priority.
    layers: Vec<ConfigLayer>,
    disabled: bool,
    no_auto_tools: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Config {
    /// Only the built-in defaults layer.
    pub fn builtin() -> Self {
        Self {
            layers: vec![defaults::layer()],
            disabled: false,
            no_auto_tools: false,
        }
    }

    /// Load every layer that applies to the project.
    pub fn load(
        layout: &Layout,
        toolchain: &Toolchain,
        options: &LoadOptions,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::builtin();
        config.no_auto_tools = options.no_auto_tools;

        if options.no_config {
            config.disabled = true;
            return Ok(config);
        }

        if layout.tackfile().is_file() {
            let generator = TackfileGenerator::new(layout, toolchain);
            let generated = bootstrap::generate(&generator, &layout.tackfile_dir())?;
            config.push_layer(read_layer(LayerSource::Tackfile(generated))?);
        }

        match &options.config_path {
            Some(path) => config.push_layer(read_layer(LayerSource::Ini(layout.resolve(path)))?),
            None => {
                let ini = layout.tack_ini();
                if ini.is_file() {
                    config.push_layer(read_layer(LayerSource::Ini(ini))?);
                }
            }
        }

        Ok(config)
    }

    /// Add a layer above all existing ones.
    pub fn push_layer(&mut self, layer: ConfigLayer) {
        tracing::debug!(source = %layer.source, defs = layer.defs.len(), "config layer loaded");
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[ConfigLayer] {
        &self.layers
    }

    /// `--no-config` was given.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Path of the highest-priority document that was loaded.
    pub fn source_path(&self) -> Option<&Path> {
        self.layers.iter().rev().find_map(|l| l.source.path())
    }

    /// Override record from the highest layer that has one for `name`.
    pub fn override_for(&self, name: &str) -> Option<&TargetOverride> {
        self.layers.iter().rev().find_map(|l| l.override_for(name))
    }

    pub fn default_target(&self) -> &str {
        self.layers
            .iter()
            .rev()
            .find_map(|l| l.settings.default_target.as_deref())
            .unwrap_or(DEFAULT_TARGET)
    }

    pub fn auto_tools(&self) -> AutoTools {
        if self.no_auto_tools {
            return AutoTools::DisabledByCli;
        }
        let from_config = self
            .layers
            .iter()
            .rev()
            .find_map(|l| l.settings.disable_auto_tools)
            .unwrap_or(false);
        if from_config {
            AutoTools::DisabledByConfig
        } else {
            AutoTools::Enabled
        }
    }

    pub fn disable_auto_tools(&self) -> bool {
        self.auto_tools() != AutoTools::Enabled
    }

    pub fn set_no_auto_tools(&mut self, no_auto_tools: bool) {
        self.no_auto_tools = no_auto_tools;
    }
}

fn read_layer(source: LayerSource) -> Result<ConfigLayer, ConfigError> {
    let path = source.path().map(Path::to_path_buf).unwrap_or_default();
    let doc = IniDocument::load(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        source: e,
    })?;
    Ok(ConfigLayer::from_document(source, doc))
}
