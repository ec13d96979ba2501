//! # tack - Tiny ANSI-C Kit
//!
//! A build driver for C projects that follow a few directory conventions:
//! `src/` (or `src/app/`) for the app, `src/core/` for code shared between
//! targets, `tools/<name>/` for extra programs and `tests/` for standalone
//! `*_test.c` programs.
//!
//! ## Module Organization
//!
//! - [`config`] - layered configuration (`tack.ini`, `tackfile.c`, built-ins)
//! - [`graph`] - target discovery and definitions
//! - [`build`] - incremental compile, link, tests
//! - [`depfile`] - make-style dependency files and staleness
//! - [`process`] - spawning compiler processes

/// Compiling, linking and testing targets.
pub mod build;

/// `list`, `doctor` and `init`.
pub mod commands;

/// Layered project configuration.
pub mod config;

/// Dependency files and rebuild decisions.
pub mod depfile;

/// The target graph.
pub mod graph;

/// Directory conventions and output paths.
pub mod layout;

/// Child process handling.
pub mod process;

/// Recursive source scanning.
pub mod scan;

/// Compiler resolution and flags.
pub mod toolchain;

/// Terminal UI utilities (tables, progress).
pub mod ui;
