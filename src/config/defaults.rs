//! Built-in configuration, the lowest-priority layer.

use super::ini::ProjectSettings;
use super::{ConfigLayer, LayerSource, TargetOverride};

/// The app links the shared core and sees `src/` headers by default.
pub fn layer() -> ConfigLayer {
    ConfigLayer {
        source: LayerSource::Defaults,
        settings: ProjectSettings::default(),
        defs: Vec::new(),
        overrides: vec![(
            "app".to_string(),
            TargetOverride {
                includes: vec!["src".to_string()],
                use_core: true,
                ..Default::default()
            },
        )],
    }
}
