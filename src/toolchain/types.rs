use crate::layout::Profile;
use std::fmt;
use std::path::{Path, PathBuf};

/// Compiler families tack knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerType {
    /// Tiny C Compiler (the default)
    Tcc,
    /// GNU Compiler Collection (also plain `cc`)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Anything else; treated as a gcc-compatible driver
    Other,
}

impl CompilerType {
    /// Classify a compiler by its executable name.
    pub fn from_program(program: &str) -> Self {
        let stem = Path::new(program)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if stem.contains("tcc") {
            CompilerType::Tcc
        } else if stem.contains("clang") {
            CompilerType::Clang
        } else if stem.contains("gcc") || stem == "cc" || stem.ends_with("-cc") {
            CompilerType::Gcc
        } else {
            CompilerType::Other
        }
    }

    pub fn is_tcc(&self) -> bool {
        matches!(self, CompilerType::Tcc)
    }
}

impl fmt::Display for CompilerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompilerType::Tcc => "tcc",
            CompilerType::Gcc => "gcc",
            CompilerType::Clang => "clang",
            CompilerType::Other => "cc-compatible",
        };
        f.write_str(name)
    }
}

/// Where the compiler choice came from (shown by `tack doctor`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerSource {
    /// `TACK_CC` environment variable
    Env,
    /// Found on `PATH`
    SearchPath(PathBuf),
    /// Nothing found; the built-in default is used as-is
    Fallback,
}

/// The resolved compiler for this process.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub compiler_type: CompilerType,
    /// Program name or path passed as `argv[0]`
    pub cc: String,
    pub source: CompilerSource,
}

const WARN_FLAGS_BASE: &[&str] = &[
    "-Wall",
    "-Werror",
    "-Wwrite-strings",
    "-Wimplicit-function-declaration",
];

impl Toolchain {
    pub fn new(cc: impl Into<String>, source: CompilerSource) -> Self {
        let cc = cc.into();
        Self {
            compiler_type: CompilerType::from_program(&cc),
            cc,
            source,
        }
    }

    /// Warning flags. tcc warns about GCC attributes in system headers, so
    /// `-Wunsupported` is off unless `strict`.
    pub fn warning_flags(&self, strict: bool) -> Vec<String> {
        let mut flags: Vec<String> = WARN_FLAGS_BASE.iter().map(|s| s.to_string()).collect();
        if self.compiler_type.is_tcc() {
            if strict {
                flags.push("-Wunsupported".to_string());
            } else {
                flags.push("-Wno-unsupported".to_string());
            }
        }
        flags
    }

    pub fn profile_flags(&self, profile: Profile) -> Vec<String> {
        match profile {
            Profile::Debug => {
                let mut flags = vec!["-g".to_string()];
                if self.compiler_type.is_tcc() {
                    flags.push("-bt20".to_string());
                }
                flags.push("-DDEBUG=1".to_string());
                flags
            }
            Profile::Release => vec!["-O2".to_string(), "-DNDEBUG=1".to_string()],
        }
    }
}
