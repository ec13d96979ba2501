//! Compiler selection.
//!
//! The compiler is resolved once at startup: `TACK_CC` wins, otherwise the
//! first of `tcc`, `cc`, `gcc`, `clang` found on `PATH`, otherwise plain
//! `tcc` (spawning will then report it missing).

pub mod types;

pub use types::{CompilerSource, CompilerType, Toolchain};

use std::ffi::OsStr;
use std::path::PathBuf;

/// Environment variable overriding the compiler.
pub const CC_ENV: &str = "TACK_CC";

/// Compiler used when nothing else is configured.
pub const DEFAULT_CC: &str = "tcc";

const SEARCH_ORDER: &[&str] = &[DEFAULT_CC, "cc", "gcc", "clang"];

/// Resolve the compiler from the process environment.
pub fn detect_toolchain() -> Toolchain {
    resolve(
        std::env::var(CC_ENV).ok(),
        std::env::var_os("PATH").as_deref(),
    )
}

/// Resolve from an explicit override value and `PATH` string.
pub fn resolve(override_cc: Option<String>, path_var: Option<&OsStr>) -> Toolchain {
    if let Some(cc) = override_cc.filter(|v| !v.trim().is_empty()) {
        return Toolchain::new(cc, CompilerSource::Env);
    }

    for candidate in SEARCH_ORDER {
        if let Some(found) = path_var.and_then(|p| find_in_path(candidate, p)) {
            tracing::debug!(compiler = %found.display(), "found compiler on PATH");
            return Toolchain::new(*candidate, CompilerSource::SearchPath(found));
        }
    }

    Toolchain::new(DEFAULT_CC, CompilerSource::Fallback)
}

fn find_in_path(program: &str, path_var: &OsStr) -> Option<PathBuf> {
    let file_name = if cfg!(windows) {
        format!("{program}.exe")
    } else {
        program.to_string()
    };

    std::env::split_paths(path_var)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}
