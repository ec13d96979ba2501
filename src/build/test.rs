use super::{BuildError, BuildOptions};
use crate::depfile::mtime;
use crate::layout::{Layout, executable_name};
use crate::process::{self, OutputMode};
use crate::scan;
use crate::toolchain::Toolchain;
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};

const TEST_SUFFIX: &str = "_test.c";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: Vec<String>,
    /// Tests that failed to build or exited non-zero.
    pub failed: Vec<String>,
}

impl TestSummary {
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Build and run every `tests/**/*_test.c` as a standalone program.
pub fn run_tests(
    layout: &Layout,
    toolchain: &Toolchain,
    options: &BuildOptions,
) -> Result<TestSummary, BuildError> {
    let sources = scan::scan(&layout.tests_dir(), TEST_SUFFIX, &[]);
    let mut summary = TestSummary::default();

    if sources.is_empty() {
        println!("{} No *{} files under tests/", "!".yellow(), TEST_SUFFIX);
        return Ok(summary);
    }

    let bin_dir = layout.build_dir().join("tests").join(options.profile.name()).join("bin");
    fs::create_dir_all(&bin_dir).map_err(|e| BuildError::io("creating test output directory", e))?;

    println!("{} Running {} tests...", "🧪".magenta(), sources.len());

    for src in &sources {
        let name = src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let binary = bin_dir.join(executable_name(&name));

        print!("   TEST {} ... ", name.bold());

        if test_needs_build(src, &binary, options.force) {
            let argv = test_argv(layout, toolchain, options, src, &binary);
            if options.verbose {
                println!("\n{}", process::format_argv(&argv));
            }
            let status = process::run(&argv, OutputMode::Capture)?;
            if !status.success() {
                println!("{}", "COMPILE FAIL".red());
                println!("{}", status.stderr.trim_end());
                summary.failed.push(name);
                continue;
            }
        }

        // output of the test itself goes straight to the terminal
        println!();
        match process::run(&[binary.to_string_lossy().into_owned()], OutputMode::Inherit) {
            Ok(status) if status.success() => {
                println!("   {} {}", "PASS".green(), name);
                summary.passed.push(name);
            }
            Ok(status) => {
                println!("   {} {} (exit code {})", "FAIL".red(), name, status.code);
                summary.failed.push(name);
            }
            Err(e) => {
                println!("   {} {} ({})", "EXEC FAIL".red(), name, e);
                summary.failed.push(name);
            }
        }
    }

    println!(
        "\nTest Result: {}/{} passed.",
        summary.passed.len(),
        summary.total()
    );
    if summary.success() {
        println!("{}", "ALL TESTS PASSED".green().bold());
    } else {
        println!("{}", "SOME TESTS FAILED".red().bold());
    }

    Ok(summary)
}

fn test_needs_build(src: &Path, binary: &Path, force: bool) -> bool {
    if force {
        return true;
    }
    match (mtime(binary), mtime(src)) {
        (Some(bin), Some(src)) => src > bin,
        _ => true,
    }
}

fn test_argv(
    layout: &Layout,
    toolchain: &Toolchain,
    options: &BuildOptions,
    src: &Path,
    binary: &Path,
) -> Vec<String> {
    let includes: [PathBuf; 3] = [layout.include_dir(), layout.tests_dir(), layout.src_dir()];

    let mut argv = vec![toolchain.cc.clone()];
    argv.extend(toolchain.warning_flags(options.strict));
    argv.extend(toolchain.profile_flags(options.profile));
    argv.extend(includes.iter().map(|p| format!("-I{}", p.display())));
    argv.push("-o".to_string());
    argv.push(binary.to_string_lossy().into_owned());
    argv.push(src.to_string_lossy().into_owned());
    argv
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::toolchain::CompilerSource;
    use std::os::unix::fs::PermissionsExt;

    /// A "compiler" that turns `foo_test.c` into a script running its body.
    const FAKE_CC: &str = r#"#!/bin/sh
out=""; src=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift ;;
    *.c) src="$1" ;;
  esac
  shift
done
grep -q '#error' "$src" && { echo "$src: error" >&2; exit 1; }
{ echo '#!/bin/sh'; cat "$src"; } > "$out"
chmod +x "$out"
"#;

    fn project(tests: &[(&str, &str)]) -> (tempfile::TempDir, Toolchain) {
        let dir = tempfile::tempdir().unwrap();
        let cc = dir.path().join("fakecc");
        fs::write(&cc, FAKE_CC).unwrap();
        fs::set_permissions(&cc, fs::Permissions::from_mode(0o755)).unwrap();
        for (name, body) in tests {
            let path = dir.path().join("tests").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        let tc = Toolchain::new(cc.to_string_lossy(), CompilerSource::Env);
        (dir, tc)
    }

    #[test]
    fn test_no_tests_is_success() {
        let (dir, tc) = project(&[]);
        let summary = run_tests(&Layout::new(dir.path()), &tc, &BuildOptions::default()).unwrap();
        assert_eq!(summary.total(), 0);
        assert!(summary.success());
    }

    #[test]
    fn test_pass_fail_and_compile_fail() {
        let (dir, tc) = project(&[
            ("ok_test.c", "exit 0\n"),
            ("nested/bad_test.c", "exit 3\n"),
            ("broken_test.c", "#error nope\n"),
            ("helper.c", "exit 9\n"),
        ]);
        let layout = Layout::new(dir.path());

        let summary = run_tests(&layout, &tc, &BuildOptions::default()).unwrap();
        assert_eq!(summary.passed, vec!["ok_test"]);
        let mut failed = summary.failed.clone();
        failed.sort();
        assert_eq!(failed, vec!["bad_test", "broken_test"]);
        assert!(!summary.success());
        assert!(layout.build_dir().join("tests/debug/bin/ok_test").exists());
    }

    #[test]
    fn test_binary_rebuilt_only_when_stale() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a_test.c");
        let bin = dir.path().join("a_test");
        fs::write(&src, "").unwrap();
        assert!(test_needs_build(&src, &bin, false));

        fs::write(&bin, "").unwrap();
        fs::File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(std::time::SystemTime::now() - std::time::Duration::from_secs(30))
            .unwrap();
        assert!(!test_needs_build(&src, &bin, false));
        assert!(test_needs_build(&src, &bin, true));
    }
}
