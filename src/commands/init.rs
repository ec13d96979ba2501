//! `tack init`: project skeleton.

use crate::layout::Layout;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

const MAIN_C: &str = r#"#include <stdio.h>

int main(int argc, char **argv) {
  (void)argc; (void)argv;
  puts("Hello from tack!");
  return 0;
}
"#;

const SMOKE_TEST_C: &str = r#"#include <stdio.h>

int main(void) {
  puts("smoke_test: ok");
  return 0;
}
"#;

/// Create the conventional directories and starter files. Existing files
/// are never touched.
pub fn init_project(layout: &Layout) -> Result<()> {
    let dirs = [
        layout.src_dir(),
        layout.include_dir(),
        layout.tests_dir(),
        layout.tools_dir(),
        layout.build_dir(),
        layout.core_dir(),
        layout.app_dir(),
    ];
    for dir in &dirs {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let main_c = layout.src_dir().join("main.c");
    if !main_c.exists() && !layout.app_dir().join("main.c").exists() {
        write_new(layout, &main_c, MAIN_C)?;
    }
    write_new(layout, &layout.tests_dir().join("smoke_test.c"), SMOKE_TEST_C)?;

    println!(
        "{} Ensured src/ include/ tests/ tools/ build/ in {}",
        "✓".green(),
        layout.root().display()
    );
    Ok(())
}

fn write_new(layout: &Layout, path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, content).with_context(|| format!("Failed to create {}", path.display()))?;
    println!("   {} {}", "+".green(), layout.relative(path).display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_skeleton() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        init_project(&layout).unwrap();

        for d in ["src", "include", "tests", "tools", "build", "src/core", "src/app"] {
            assert!(dir.path().join(d).is_dir(), "{d}");
        }
        assert_eq!(fs::read_to_string(dir.path().join("src/main.c")).unwrap(), MAIN_C);
        assert!(dir.path().join("tests/smoke_test.c").is_file());
    }

    #[test]
    fn test_init_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/app")).unwrap();
        fs::write(dir.path().join("src/app/main.c"), "int main(void){return 0;}").unwrap();
        fs::create_dir_all(dir.path().join("tests")).unwrap();
        fs::write(dir.path().join("tests/smoke_test.c"), "custom").unwrap();

        init_project(&Layout::new(dir.path())).unwrap();
        assert!(!dir.path().join("src/main.c").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("tests/smoke_test.c")).unwrap(),
            "custom"
        );
    }
}
