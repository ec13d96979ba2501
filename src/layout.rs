//! Project directory conventions and the build output layout.
//!
//! ```text
//! src/            app sources (or src/app/ when it exists)
//! src/core/       shared core, compiled once per profile
//! include/        public headers
//! tools/<name>/   one target per subdirectory, named tool:<name>
//! tests/          recursive *_test.c programs
//! build/<id>/<profile>/{obj,dep,bin}
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Pseudo-target id holding shared core objects.
pub const CORE_ID: &str = "_core";

/// Optimization profile; each gets its own output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Profile {
    #[default]
    Debug,
    Release,
}

impl Profile {
    pub fn name(&self) -> &'static str {
        match self {
            Profile::Debug => "debug",
            Profile::Release => "release",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output directories for one target and profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirs {
    pub root: PathBuf,
    pub obj: PathBuf,
    pub dep: PathBuf,
    pub bin: PathBuf,
}

impl OutputDirs {
    /// Create all three directories (idempotent).
    pub fn create(&self) -> io::Result<()> {
        fs::create_dir_all(&self.obj)?;
        fs::create_dir_all(&self.dep)?;
        fs::create_dir_all(&self.bin)
    }
}

/// Paths of a project rooted at one directory.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a project-relative path (absolute paths pass through).
    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn app_dir(&self) -> PathBuf {
        self.root.join("src").join("app")
    }

    pub fn core_dir(&self) -> PathBuf {
        self.root.join("src").join("core")
    }

    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include")
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.root.join("tests")
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.root.join("tools")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(crate::scan::BUILD_DIR_NAME)
    }

    /// Declarative configuration picked up automatically.
    pub fn tack_ini(&self) -> PathBuf {
        self.root.join("tack.ini")
    }

    /// Code configuration turned into a data layer by the bootstrap.
    pub fn tackfile(&self) -> PathBuf {
        self.root.join("tackfile.c")
    }

    pub fn tackfile_dir(&self) -> PathBuf {
        self.build_dir().join("_tackfile")
    }

    pub fn output_dirs(&self, target_id: &str, profile: Profile) -> OutputDirs {
        let root = self.build_dir().join(target_id).join(profile.name());
        OutputDirs {
            obj: root.join("obj"),
            dep: root.join("dep"),
            bin: root.join("bin"),
            root,
        }
    }

    pub fn binary_path(&self, target_id: &str, profile: Profile, bin_base: &str) -> PathBuf {
        self.output_dirs(target_id, profile)
            .bin
            .join(executable_name(bin_base))
    }

    /// Object and depfile paths for `source` inside `dirs`.
    pub fn object_paths(&self, dirs: &OutputDirs, source: &Path) -> (PathBuf, PathBuf) {
        let stem = object_stem(self.relative(source));
        (
            dirs.obj.join(format!("{stem}.o")),
            dirs.dep.join(format!("{stem}.d")),
        )
    }

    /// `path` relative to the project root when it is inside it.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

pub fn executable_name(bin_base: &str) -> String {
    if cfg!(windows) {
        format!("{bin_base}.exe")
    } else {
        bin_base.to_string()
    }
}

/// Filesystem-safe id from a target name: `tool:foo` => `tool_foo`.
pub fn sanitize_name_to_id(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Object file stem from a project-relative source path.
pub fn object_stem(rel: &Path) -> String {
    rel.to_string_lossy()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '.' | ':' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name_to_id() {
        assert_eq!(sanitize_name_to_id("app"), "app");
        assert_eq!(sanitize_name_to_id("tool:foo"), "tool_foo");
        assert_eq!(sanitize_name_to_id("demo hello/v2"), "demo_hello_v2");
        assert_eq!(sanitize_name_to_id("keep-dash_ok"), "keep-dash_ok");
    }

    #[test]
    fn test_object_paths_use_relative_source() {
        let layout = Layout::new("/proj");
        let dirs = layout.output_dirs("app", Profile::Debug);
        let (obj, dep) = layout.object_paths(&dirs, Path::new("/proj/src/net/http.c"));
        assert_eq!(obj, PathBuf::from("/proj/build/app/debug/obj/src_net_http_c.o"));
        assert_eq!(dep, PathBuf::from("/proj/build/app/debug/dep/src_net_http_c.d"));
    }

    #[test]
    fn test_output_layout() {
        let layout = Layout::new("/proj");
        let dirs = layout.output_dirs("tool_gen", Profile::Release);
        assert_eq!(dirs.root, PathBuf::from("/proj/build/tool_gen/release"));
        assert_eq!(dirs.bin, PathBuf::from("/proj/build/tool_gen/release/bin"));
        assert_eq!(
            layout.binary_path("tool_gen", Profile::Release, "gen"),
            PathBuf::from("/proj/build/tool_gen/release/bin").join(executable_name("gen"))
        );
    }
}
