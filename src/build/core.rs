use super::BuildError;
use super::scheduler::{Job, Scheduler};
use crate::config::{Config, TargetOverride};
use crate::depfile::{mtime, needs_rebuild};
use crate::graph::Target;
use crate::layout::{CORE_ID, Layout, OutputDirs, Profile};
use crate::process::{self, OutputMode};
use crate::scan;
use crate::toolchain::Toolchain;
use crate::ui;
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Name of the link record kept next to each target's `obj/`.
const LINK_MANIFEST: &str = "link.json";

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub profile: Profile,
    pub verbose: bool,
    /// `--rebuild`: ignore timestamps.
    pub force: bool,
    pub jobs: usize,
    pub strict: bool,
    /// `--no-core`: never link the shared core.
    pub no_core: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            profile: Profile::Debug,
            verbose: false,
            force: false,
            jobs: 1,
            strict: false,
            no_core: false,
        }
    }
}

/// What one `build_target` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub target: String,
    pub binary: PathBuf,
    /// Translation units compiled, core included.
    pub compiled: usize,
    pub linked: bool,
}

impl BuildOutcome {
    pub fn up_to_date(&self) -> bool {
        self.compiled == 0 && !self.linked
    }
}

#[derive(Serialize)]
struct CompileCommand {
    directory: String,
    command: String,
    file: String,
}

/// The exact link line of the last successful link.
#[derive(Serialize, Deserialize, PartialEq)]
struct LinkManifest {
    argv: Vec<String>,
}

/// Compile flags shared by every source of one unit.
struct UnitFlags {
    includes: Vec<PathBuf>,
    defines: Vec<String>,
    cflags: Vec<String>,
}

struct CompiledUnit {
    objects: Vec<PathBuf>,
    compiled: usize,
}

/// Builds targets of one project. The shared core is compiled at most once
/// per builder and reused by every target that links it.
pub struct Builder<'a> {
    layout: &'a Layout,
    config: &'a Config,
    toolchain: &'a Toolchain,
    options: BuildOptions,
    core_objects: Option<Vec<PathBuf>>,
}

impl<'a> Builder<'a> {
    pub fn new(
        layout: &'a Layout,
        config: &'a Config,
        toolchain: &'a Toolchain,
        options: BuildOptions,
    ) -> Self {
        Self {
            layout,
            config,
            toolchain,
            options,
            core_objects: None,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn build_target(&mut self, target: &Target) -> Result<BuildOutcome, BuildError> {
        let start = Instant::now();
        let ov = self
            .config
            .override_for(&target.name)
            .cloned()
            .unwrap_or_default();
        let use_core = ov.use_core && !self.options.no_core;

        let sources = self.target_sources(target);
        if sources.is_empty() {
            return Err(BuildError::NoSources {
                target: target.name.clone(),
                dir: self.layout.resolve(&target.src_dir),
            });
        }

        let mut compiled = 0;
        let core_objects = if use_core {
            let (objects, n) = self.core()?;
            compiled += n;
            objects
        } else {
            Vec::new()
        };

        let dirs = self.layout.output_dirs(&target.id, self.options.profile);
        dirs.create().map_err(|e| BuildError::io("creating output directories", e))?;

        let flags = self.target_flags(target, &ov);
        let unit = self.compile_unit(&target.name, &sources, &dirs, &flags)?;
        compiled += unit.compiled;

        let mut objects = unit.objects;
        objects.extend(core_objects);

        let binary = self
            .layout
            .binary_path(&target.id, self.options.profile, &target.bin_base);
        let link_argv = self.link_argv(&flags, &ov, &binary, &objects);
        let manifest_path = dirs.root.join(LINK_MANIFEST);

        let linked = if self.needs_link(&binary, &objects, &manifest_path, &link_argv) {
            self.link(&binary, &link_argv, &manifest_path)?;
            true
        } else {
            false
        };

        let outcome = BuildOutcome {
            target: target.name.clone(),
            binary,
            compiled,
            linked,
        };

        if outcome.up_to_date() {
            println!("{} {} is up to date", "⚡".green(), target.name);
        } else {
            println!(
                "{} Built {} ({}) in {:.2?}",
                "✓".green(),
                target.name.bold(),
                self.options.profile,
                start.elapsed()
            );
        }
        Ok(outcome)
    }

    /// Core objects, compiling them on first use. Returns the objects and
    /// how many were compiled by this call.
    fn core(&mut self) -> Result<(Vec<PathBuf>, usize), BuildError> {
        if let Some(objects) = &self.core_objects {
            return Ok((objects.clone(), 0));
        }

        let core_dir = self.layout.core_dir();
        let sources = scan::scan(&core_dir, ".c", &[]);
        if sources.is_empty() {
            tracing::debug!("no core sources");
            self.core_objects = Some(Vec::new());
            return Ok((Vec::new(), 0));
        }

        let dirs = self.layout.output_dirs(CORE_ID, self.options.profile);
        dirs.create().map_err(|e| BuildError::io("creating core output directories", e))?;

        let flags = UnitFlags {
            includes: vec![self.layout.include_dir(), self.layout.src_dir(), core_dir],
            defines: Vec::new(),
            cflags: Vec::new(),
        };
        let unit = self.compile_unit("core", &sources, &dirs, &flags)?;
        self.core_objects = Some(unit.objects.clone());
        Ok((unit.objects, unit.compiled))
    }

    /// `.c` files of a target. The app never compiles `src/core` itself, and
    /// an app living in `src/app` still picks up a legacy `src/main.c`.
    fn target_sources(&self, target: &Target) -> Vec<PathBuf> {
        let is_app = target.name == "app";
        let mut excluded = Vec::new();
        if is_app && target.src_dir == Path::new("src") && self.layout.core_dir().is_dir() {
            excluded.push("core");
        }

        let mut sources = scan::scan(&self.layout.resolve(&target.src_dir), ".c", &excluded);

        if is_app && target.src_dir == Path::new("src/app") {
            let legacy = self.layout.src_dir().join("main.c");
            if legacy.is_file() && !sources.contains(&legacy) {
                sources.push(legacy);
            }
        }
        sources
    }

    fn target_flags(&self, target: &Target, ov: &TargetOverride) -> UnitFlags {
        let mut includes = vec![
            self.layout.include_dir(),
            self.layout.resolve(&target.src_dir),
            self.layout.src_dir(),
        ];
        let core_dir = self.layout.core_dir();
        if core_dir.is_dir() {
            includes.push(core_dir);
        }
        for inc in &ov.includes {
            includes.push(self.layout.resolve(inc));
        }
        includes.dedup();

        UnitFlags {
            includes,
            defines: ov.defines.clone(),
            cflags: ov.cflags.clone(),
        }
    }

    /// Warnings, profile flags, `-I` and `-D`, in that order.
    fn base_args(&self, flags: &UnitFlags) -> Vec<String> {
        let mut args = self.toolchain.warning_flags(self.options.strict);
        args.extend(self.toolchain.profile_flags(self.options.profile));
        args.extend(flags.includes.iter().map(|p| format!("-I{}", p.display())));
        args.extend(flags.defines.iter().map(|d| format!("-D{d}")));
        args
    }

    fn compile_argv(&self, flags: &UnitFlags, src: &Path, obj: &Path, dep: &Path) -> Vec<String> {
        let mut argv = vec![self.toolchain.cc.clone(), "-c".to_string()];
        argv.extend(self.base_args(flags));
        argv.extend(flags.cflags.iter().cloned());
        argv.extend([
            "-MD".to_string(),
            "-MF".to_string(),
            dep.to_string_lossy().into_owned(),
            "-o".to_string(),
            obj.to_string_lossy().into_owned(),
            src.to_string_lossy().into_owned(),
        ]);
        argv
    }

    fn link_argv(
        &self,
        flags: &UnitFlags,
        ov: &TargetOverride,
        binary: &Path,
        objects: &[PathBuf],
    ) -> Vec<String> {
        let mut argv = vec![self.toolchain.cc.clone()];
        argv.extend(self.base_args(flags));
        argv.extend(ov.ldflags.iter().cloned());
        argv.push("-o".to_string());
        argv.push(binary.to_string_lossy().into_owned());
        argv.extend(objects.iter().map(|o| o.to_string_lossy().into_owned()));
        argv.extend(ov.libs.iter().cloned());
        argv
    }

    /// Compile the stale subset of `sources` and write `compile_commands.json`.
    fn compile_unit(
        &self,
        label: &str,
        sources: &[PathBuf],
        dirs: &OutputDirs,
        flags: &UnitFlags,
    ) -> Result<CompiledUnit, BuildError> {
        let directory = self.layout.root().to_string_lossy().into_owned();
        let mut objects = Vec::with_capacity(sources.len());
        let mut commands = Vec::with_capacity(sources.len());
        let mut jobs = Vec::new();

        for src in sources {
            let (obj, dep) = self.layout.object_paths(dirs, src);
            let argv = self.compile_argv(flags, src, &obj, &dep);

            commands.push(CompileCommand {
                directory: directory.clone(),
                command: process::format_argv(&argv),
                file: src.to_string_lossy().into_owned(),
            });
            if needs_rebuild(&obj, src, &dep, self.options.force) {
                jobs.push(Job {
                    argv,
                    label: self.layout.relative(src).display().to_string(),
                });
            }
            objects.push(obj);
        }

        let compiled = jobs.len();
        if compiled > 0 {
            let pb = ui::progress_bar(compiled as u64, !self.options.verbose);
            let scheduler = Scheduler::new(self.options.jobs, self.options.verbose, pb.clone());
            let result = scheduler.run_many(jobs);
            pb.finish_and_clear();
            result.map_err(|source| BuildError::Compile {
                target: label.to_string(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(&commands)
            .map_err(|e| BuildError::io("serializing compile commands", e.into()))?;
        fs::write(dirs.root.join("compile_commands.json"), json)
            .map_err(|e| BuildError::io("writing compile_commands.json", e))?;

        Ok(CompiledUnit { objects, compiled })
    }

    /// Relink when forced, when the binary is missing or older than any
    /// object, or when the link line changed (e.g. a source was deleted).
    fn needs_link(
        &self,
        binary: &Path,
        objects: &[PathBuf],
        manifest_path: &Path,
        argv: &[String],
    ) -> bool {
        if self.options.force {
            return true;
        }
        let Some(bin_time) = mtime(binary) else {
            tracing::debug!(binary = %binary.display(), "link: binary missing");
            return true;
        };
        if let Some(obj) = objects
            .iter()
            .find(|obj| mtime(obj).is_none_or(|t| t > bin_time))
        {
            tracing::debug!(object = %obj.display(), "link: object missing or newer");
            return true;
        }

        let previous = fs::read_to_string(manifest_path)
            .ok()
            .and_then(|text| serde_json::from_str::<LinkManifest>(&text).ok());
        if previous.is_none_or(|m| m.argv != argv) {
            tracing::debug!("link: link line changed");
            return true;
        }
        false
    }

    fn link(&self, binary: &Path, argv: &[String], manifest_path: &Path) -> Result<(), BuildError> {
        if self.options.verbose {
            println!("{}", process::format_argv(argv));
        }
        println!("   {} Linking {}", "🔗".cyan(), self.layout.relative(binary).display());

        // The record only describes a binary that linked successfully.
        remove_if_exists(manifest_path).map_err(|e| BuildError::io("removing link manifest", e))?;

        let status = process::run(argv, OutputMode::Capture)?;
        let stderr = status.stderr.trim_end();
        if !status.success() {
            if !stderr.is_empty() {
                eprintln!("{stderr}");
            }
            println!("{} Linking failed", "x".red());
            if let Err(e) = remove_if_exists(binary) {
                tracing::warn!(
                    binary = %binary.display(),
                    error = %e,
                    "could not remove partial binary"
                );
            }
            return Err(BuildError::Link {
                binary: binary.to_path_buf(),
                code: status.code,
            });
        }
        if !stderr.is_empty() {
            println!("{} Warning while linking:\n{}", "!".yellow(), stderr);
        }

        let manifest = LinkManifest {
            argv: argv.to_vec(),
        };
        let json = serde_json::to_string(&manifest)
            .map_err(|e| BuildError::io("serializing link manifest", e.into()))?;
        fs::write(manifest_path, json).map_err(|e| BuildError::io("writing link manifest", e))?;
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
