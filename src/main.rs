//! # tack CLI Entry Point
//!
//! Global options (`--no-config`, `--config`, `--no-auto-tools`) come before
//! the command. Without a command the default target is built in debug mode.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use tack::build::{self, BuildError, BuildOptions, Builder};
use tack::commands;
use tack::config::{Config, ConfigError, LoadOptions};
use tack::graph::{GraphError, TargetGraph};
use tack::layout::{Layout, Profile};
use tack::toolchain;

/// Environment variable holding the log filter, e.g. `TACK_LOG=tack=debug`.
const LOG_ENV: &str = "TACK_LOG";

#[derive(Parser)]
#[command(name = "tack")]
#[command(about = "Tiny ANSI-C Kit: a build driver for C projects", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Ignore tackfile.c and tack.ini, use built-in defaults only
    #[arg(long)]
    no_config: bool,
    /// Use this file instead of tack.ini
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Do not turn tools/<name>/ into targets
    #[arg(long)]
    no_auto_tools: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Debug)]
struct BuildArgs {
    /// Optimization profile
    #[arg(value_enum, default_value_t = Profile::Debug)]
    profile: Profile,
    /// Target name or id [default: configured default target]
    #[arg(long, value_name = "NAME")]
    target: Option<String>,
    /// Print every compiler and linker command
    #[arg(short, long)]
    verbose: bool,
    /// Recompile and relink everything
    #[arg(long)]
    rebuild: bool,
    /// Maximum number of compiler processes
    #[arg(short = 'j', long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: u16,
    /// Enable -Wunsupported (tcc)
    #[arg(long)]
    strict: bool,
    /// Do not link the shared core
    #[arg(long)]
    no_core: bool,
}

impl BuildArgs {
    fn options(&self) -> BuildOptions {
        BuildOptions {
            profile: self.profile,
            verbose: self.verbose,
            force: self.rebuild,
            jobs: usize::from(self.jobs),
            strict: self.strict,
            no_core: self.no_core,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build a target
    Build(BuildArgs),
    /// Build a target and run it
    Run {
        #[command(flatten)]
        build: BuildArgs,
        /// Arguments passed to the program (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Build and run tests/**/*_test.c
    Test {
        #[arg(value_enum, default_value_t = Profile::Debug)]
        profile: Profile,
        #[arg(short, long)]
        verbose: bool,
        #[arg(long)]
        rebuild: bool,
        #[arg(long)]
        strict: bool,
    },
    /// Show all targets, including disabled ones
    List,
    /// Show compiler, directories and configuration in effect
    Doctor,
    /// Create the conventional directories and starter files
    Init,
    /// Remove the contents of build/
    Clean,
    /// Remove build/ itself
    Clobber,
    /// Print the tack version
    Version,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => report(&e),
    }
}

/// Configuration and target errors exit with 2, build failures with 1.
fn report(e: &anyhow::Error) -> ExitCode {
    eprintln!("{} {:#}", "x".red(), e);

    if let Some(BuildError::UnknownTarget(_)) = e.downcast_ref::<BuildError>() {
        eprintln!("  hint: use '{}'", "tack list".bold());
        return ExitCode::from(2);
    }
    if e.downcast_ref::<ConfigError>().is_some() || e.downcast_ref::<GraphError>().is_some() {
        return ExitCode::from(2);
    }
    ExitCode::FAILURE
}

fn run(cli: Cli) -> Result<ExitCode> {
    let root = std::env::current_dir().context("Failed to read the current directory")?;
    let layout = Layout::new(root);

    // housekeeping works even when the configuration is broken
    match &cli.command {
        Some(Commands::Init) => {
            commands::init::init_project(&layout)?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Clean) => {
            build::clean(&layout)?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Clobber) => {
            build::clobber(&layout)?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Version) => {
            println!("tack {}", env!("CARGO_PKG_VERSION"));
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let toolchain = toolchain::detect_toolchain();
    let load = LoadOptions {
        no_config: cli.no_config,
        config_path: cli.config.clone(),
        no_auto_tools: cli.no_auto_tools,
    };
    let config = Config::load(&layout, &toolchain, &load)?;
    let graph = TargetGraph::build(&layout, &config)?;

    match cli.command {
        None => {
            let target = build::select_target(&graph, &config, None)?;
            Builder::new(&layout, &config, &toolchain, BuildOptions::default())
                .build_target(target)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Build(args)) => {
            let target = build::select_target(&graph, &config, args.target.as_deref())?;
            Builder::new(&layout, &config, &toolchain, args.options()).build_target(target)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Run { build: args, args: run_args }) => {
            let target = build::select_target(&graph, &config, args.target.as_deref())?;
            let outcome =
                Builder::new(&layout, &config, &toolchain, args.options()).build_target(target)?;
            println!("{} Running {}\n", "▶".green(), target.name);
            let code = build::run_binary(&outcome.binary, &run_args)?;
            Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
        }
        Some(Commands::Test {
            profile,
            verbose,
            rebuild,
            strict,
        }) => {
            let options = BuildOptions {
                profile,
                verbose,
                force: rebuild,
                strict,
                ..Default::default()
            };
            let summary = build::run_tests(&layout, &toolchain, &options)?;
            Ok(if summary.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(Commands::List) => {
            commands::list::list_targets(&config, &graph);
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Doctor) => {
            commands::doctor::run_doctor(&layout, &config, &toolchain);
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Init | Commands::Clean | Commands::Clobber | Commands::Version) => {
            Ok(ExitCode::SUCCESS)
        }
    }
}
