//! jcheck core library.
//!
//! Runs PMD and `javac -Xlint` against Java sources, parses their textual
//! output into diagnostics, and maps those onto buffer regions and a
//! navigable results list through a host-neutral [`present::Host`] trait.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Settings discovery and effective settings resolution.
//! - `invoke`: Command construction and subprocess execution with timeout.
//! - `parse`: PMD and XLint output parsers.
//! - `present`: Regions, results list, host trait, per-file result store.
//! - `check`: Orchestration of tools for one or many files.
//! - `watch`: Check-on-save.
//! - `models`: Diagnostic and report data models.
//! - `output`: Human/JSON printers and the terminal host.
//! - `error`: Error taxonomy.
//! - `utils`: Supporting helpers.
pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod invoke;
pub mod models;
pub mod output;
pub mod parse;
pub mod present;
pub mod utils;
pub mod watch;
