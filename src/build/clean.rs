//! Build artifact cleanup.
//!
//! - `tack clean` empties `build/` but keeps the directory
//! - `tack clobber` removes `build/` itself

use crate::layout::Layout;
use anyhow::{Context, Result};
use colored::*;
use std::fs;

/// Remove everything inside `build/`. Returns whether anything was removed.
pub fn clean(layout: &Layout) -> Result<bool> {
    let build_dir = layout.build_dir();
    let Ok(entries) = fs::read_dir(&build_dir) else {
        println!("{} Nothing to clean", "!".yellow());
        return Ok(false);
    };

    let mut cleaned = false;
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read {}", build_dir.display()))?
            .path();
        if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
        .with_context(|| format!("Failed to remove {}", path.display()))?;
        cleaned = true;
    }

    if cleaned {
        println!("{} Clean complete.", "✓".green());
    } else {
        println!("{} Nothing to clean", "!".yellow());
    }
    Ok(cleaned)
}

/// Remove `build/` entirely.
pub fn clobber(layout: &Layout) -> Result<bool> {
    let build_dir = layout.build_dir();
    if !build_dir.exists() {
        println!("{} Nothing to clobber", "!".yellow());
        return Ok(false);
    }

    fs::remove_dir_all(&build_dir).context("Failed to remove build directory")?;
    println!("{} Removed {}", "✓".green(), build_dir.display());
    Ok(true)
}
