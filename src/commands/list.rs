//! `tack list`

use crate::config::Config;
use crate::graph::TargetGraph;
use crate::ui::Table;
use colored::*;

/// Where configuration came from, as shown by `list` and `doctor`.
pub fn config_source(config: &Config) -> String {
    if config.is_disabled() {
        "disabled (--no-config)".to_string()
    } else {
        match config.source_path() {
            Some(path) => path.display().to_string(),
            None => "none".to_string(),
        }
    }
}

/// Every target, disabled ones included.
pub fn list_targets(config: &Config, graph: &TargetGraph) {
    println!("{} {}", "Config:".bold(), config_source(config));

    if graph.is_empty() {
        println!("{} No targets", "!".yellow());
        return;
    }

    let mut table = Table::new(&["Target", "Id", "Src", "Core", "Enabled"]);
    for target in graph.iter() {
        let use_core = config
            .override_for(&target.name)
            .is_some_and(|ov| ov.use_core);
        table.add_row(vec![
            target.name.clone(),
            target.id.clone(),
            target.src_dir.display().to_string(),
            yes_no(use_core).to_string(),
            if target.enabled {
                "yes".green().to_string()
            } else {
                "no".red().to_string()
            },
        ]);
    }
    table.print();
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}
