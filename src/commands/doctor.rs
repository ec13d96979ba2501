//! `tack doctor`: what tack sees.

use super::list::config_source;
use crate::config::{AutoTools, Config};
use crate::layout::Layout;
use crate::toolchain::{CC_ENV, CompilerSource, Toolchain};
use colored::*;

pub fn run_doctor(layout: &Layout, config: &Config, toolchain: &Toolchain) {
    println!("{} tack doctor", "🚑".red());
    println!("-------------------------------");

    let origin = match &toolchain.source {
        CompilerSource::Env => format!("from ${CC_ENV}"),
        CompilerSource::SearchPath(path) => format!("found at {}", path.display()),
        CompilerSource::Fallback => "fallback, not found on PATH".yellow().to_string(),
    };
    println!(
        "Compiler  : {} [{}] ({origin})",
        toolchain.cc.green(),
        toolchain.compiler_type
    );
    println!("Override  : set {CC_ENV}");
    println!(
        "OS        : {} ({})",
        std::env::consts::OS.green(),
        std::env::consts::ARCH.cyan()
    );
    println!("Build dir : {}", layout.build_dir().display());

    let dir_state = |name: &str, present: bool| {
        if present {
            name.green().to_string()
        } else {
            name.dimmed().to_string()
        }
    };
    println!(
        "Dirs      : {} {} {} {} {} {}",
        dir_state("src", layout.src_dir().is_dir()),
        dir_state("src/app", layout.app_dir().is_dir()),
        dir_state("src/core", layout.core_dir().is_dir()),
        dir_state("include", layout.include_dir().is_dir()),
        dir_state("tests", layout.tests_dir().is_dir()),
        dir_state("tools", layout.tools_dir().is_dir()),
    );

    println!("Config    : {}", config_source(config));
    println!("Default target: {}", config.default_target().bold());

    let tools = match config.auto_tools() {
        AutoTools::Enabled => "enabled".green().to_string(),
        AutoTools::DisabledByCli => "disabled (CLI)".yellow().to_string(),
        AutoTools::DisabledByConfig => "disabled (config)".yellow().to_string(),
    };
    println!("Auto tool discovery: {tools}");
    println!("Layers    : built-ins + optional tackfile.c + optional tack.ini / --config");
}
