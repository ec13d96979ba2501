//! Turning code configuration into a data layer.
//!
//! A *config provider* is any program that, invoked with a single output
//! path, writes a declarative document there. The rest of tack only ever
//! reads that document. The built-in provider compiles a tiny generator
//! around the project's `tackfile.c`, so a project can compute its target
//! table in C without tack ever linking user code into itself.
//!
//! Output is cached: when the generated document is not older than the
//! code configuration, nothing is compiled or run.

use crate::depfile::mtime;
use crate::layout::{Layout, executable_name};
use crate::process::{self, OutputMode, ProcessError};
use crate::toolchain::Toolchain;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the generated document inside the bootstrap directory.
pub const GENERATED_INI: &str = "tackfile.generated.ini";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("{} does not exist", .0.display())]
    MissingSource(PathBuf),
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("generator compile failed (exit code {code}): {command}")]
    CompileFailed { code: i32, command: String },
    #[error("generator failed with exit code {code}")]
    GeneratorFailed { code: i32 },
    #[error("generator did not write {}", .0.display())]
    NoOutput(PathBuf),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Something that can produce a declarative document from code.
pub trait ConfigProvider {
    /// The code configuration the document is derived from.
    fn source(&self) -> &Path;

    /// Make the provider program ready inside `work_dir` and return its
    /// argv. The output path is appended as the last argument.
    fn prepare(&self, work_dir: &Path) -> Result<Vec<String>, BootstrapError>;
}

/// Run `provider` unless its cached output is fresh; returns the document path.
pub fn generate(provider: &dyn ConfigProvider, work_dir: &Path) -> Result<PathBuf, BootstrapError> {
    let output = work_dir.join(GENERATED_INI);
    let source_time = mtime(provider.source())
        .ok_or_else(|| BootstrapError::MissingSource(provider.source().to_path_buf()))?;

    if mtime(&output).is_some_and(|t| t >= source_time) {
        tracing::debug!(path = %output.display(), "generated config is up to date");
        return Ok(output);
    }

    fs::create_dir_all(work_dir).map_err(|source| BootstrapError::Io {
        path: work_dir.to_path_buf(),
        source,
    })?;
    // a half-written document must never look fresh on the next run
    let _ = fs::remove_file(&output);

    let mut argv = provider.prepare(work_dir)?;
    argv.push(output.to_string_lossy().into_owned());

    tracing::debug!(command = %process::format_argv(&argv), "running config provider");
    let status = process::run(&argv, OutputMode::Inherit)?;
    if !status.success() {
        let _ = fs::remove_file(&output);
        return Err(BootstrapError::GeneratorFailed { code: status.code });
    }
    if !output.is_file() {
        return Err(BootstrapError::NoOutput(output));
    }
    Ok(output)
}

/// Compiles [`GENERATOR_SOURCE`] against the project's `tackfile.c`.
pub struct TackfileGenerator<'a> {
    layout: &'a Layout,
    toolchain: &'a Toolchain,
    source: PathBuf,
}

impl<'a> TackfileGenerator<'a> {
    pub fn new(layout: &'a Layout, toolchain: &'a Toolchain) -> Self {
        Self {
            layout,
            toolchain,
            source: layout.tackfile(),
        }
    }
}

impl ConfigProvider for TackfileGenerator<'_> {
    fn source(&self) -> &Path {
        &self.source
    }

    fn prepare(&self, work_dir: &Path) -> Result<Vec<String>, BootstrapError> {
        let gen_c = work_dir.join("tackfile_gen.c");
        let gen_exe = work_dir.join(executable_name("tackfile_gen"));

        fs::write(&gen_c, GENERATOR_SOURCE).map_err(|source| BootstrapError::Io {
            path: gen_c.clone(),
            source,
        })?;

        let argv = vec![
            self.toolchain.cc.clone(),
            "-I".to_string(),
            self.layout.root().to_string_lossy().into_owned(),
            "-I".to_string(),
            self.layout.include_dir().to_string_lossy().into_owned(),
            "-o".to_string(),
            gen_exe.to_string_lossy().into_owned(),
            gen_c.to_string_lossy().into_owned(),
        ];

        let status = process::run(&argv, OutputMode::Inherit)?;
        if !status.success() {
            return Err(BootstrapError::CompileFailed {
                code: status.code,
                command: process::format_argv(&argv),
            });
        }

        Ok(vec![gen_exe.to_string_lossy().into_owned()])
    }
}

/// C89 generator. `tackfile.c` may define:
///
/// - `TACKFILE_DEFAULT_TARGET` (string literal)
/// - `TACKFILE_DISABLE_AUTO_TOOLS` (0/1)
/// - `TACKFILE_TARGETS`: `TargetDef` array ending in a zeroed entry
/// - `TACKFILE_OVERRIDES`: `TargetOverride` array ending in a zeroed entry
pub const GENERATOR_SOURCE: &str = r##"/* generated by tack; do not edit */
#include <stdio.h>
#include <stdlib.h>
#include <string.h>

typedef struct {
  const char *name;
  const char * const *includes;
  const char * const *defines;
  const char * const *cflags;
  const char * const *ldflags;
  const char * const *libs;
  int use_core;
} TargetOverride;

typedef struct {
  const char *name;
  const char *src_dir;
  const char *bin_base;
  const char *id;
  int enabled;
  int remove;
} TargetDef;

#include "tackfile.c"

static void put_list(FILE *f, const char *key, const char * const *items) {
  int i;
  if (!items || !items[0]) return;
  fprintf(f, "%s = ", key);
  for (i = 0; items[i]; i++) {
    if (i) fputc(';', f);
    fputs(items[i], f);
  }
  fputc('\n', f);
}

int main(int argc, char **argv) {
  FILE *f;
  if (argc < 2) return 2;
  f = fopen(argv[1], "wb");
  if (!f) return 1;

  fputs("# generated from tackfile.c\n\n[project]\n", f);
#ifdef TACKFILE_DEFAULT_TARGET
  fprintf(f, "default_target = %s\n", TACKFILE_DEFAULT_TARGET);
#endif
#ifdef TACKFILE_DISABLE_AUTO_TOOLS
  fprintf(f, "disable_auto_tools = %s\n", (TACKFILE_DISABLE_AUTO_TOOLS) ? "yes" : "no");
#endif
  fputc('\n', f);

#ifdef TACKFILE_TARGETS
  {
    const TargetDef *td;
    for (td = TACKFILE_TARGETS; td->name; td++) {
      fprintf(f, "[target \"%s\"]\n", td->name);
      if (td->src_dir) fprintf(f, "src = %s\n", td->src_dir);
      if (td->bin_base) fprintf(f, "bin = %s\n", td->bin_base);
      if (td->id) fprintf(f, "id = %s\n", td->id);
      if (td->remove) {
        fputs("remove = yes\n", f);
      } else if (!td->src_dir && !td->bin_base && !td->id) {
        fputs(td->enabled ? "enabled = yes\n" : "enabled = no\n", f);
      } else if (!td->enabled) {
        fputs("enabled = no\n", f);
      }
      fputc('\n', f);
    }
  }
#endif

#ifdef TACKFILE_OVERRIDES
  {
    const TargetOverride *ov;
    for (ov = TACKFILE_OVERRIDES; ov->name; ov++) {
      fprintf(f, "[target \"%s\"]\n", ov->name);
      fputs(ov->use_core ? "core = yes\n" : "core = no\n", f);
      put_list(f, "includes", ov->includes);
      put_list(f, "defines", ov->defines);
      put_list(f, "cflags", ov->cflags);
      put_list(f, "ldflags", ov->ldflags);
      put_list(f, "libs", ov->libs);
      fputc('\n', f);
    }
  }
#endif

  return fclose(f) == 0 ? 0 : 1;
}
"##;
