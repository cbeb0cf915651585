//! Check runner: invoke enabled tools, parse their output, and keep only
//! findings for the file being checked.
//!
//! Tool failures never abort a check; they are reported next to whatever
//! the other tool produced.

use crate::config::{self, CliOverrides, Settings};
use crate::error::{CheckError, Result};
use crate::invoke;
use crate::models::{CheckReport, Diagnostic, Tool, ToolFailure};
use crate::parse;
use crate::present::{self, Host, Presentation, ResultStore, Ticket};
use crate::utils::absolute;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

fn run_one(tool: Tool, target: &Path, settings: &Settings) -> Result<Vec<Diagnostic>> {
    let output = match tool {
        Tool::Pmd => invoke::run_pmd(target, settings)?,
        Tool::Xlint => invoke::run_xlint(target, settings)?,
    };
    let parsed = parse::parse_output(tool, &output.text, &settings.severity);
    let total = parsed.len();
    let mine: Vec<Diagnostic> = parsed
        .into_iter()
        .filter(|d| parse::same_file(&d.file, target, &settings.repo_root))
        .map(|mut d| {
            d.file = target.to_path_buf();
            d
        })
        .collect();
    tracing::debug!(%tool, total, kept = mine.len(), file = %target.display(), "parsed");
    Ok(mine)
}

fn to_failure(tool: Tool, err: CheckError) -> ToolFailure {
    tracing::warn!(%tool, "{}", err);
    ToolFailure {
        tool,
        kind: err.kind(),
        message: err.to_string(),
    }
}

/// Check a single file with every enabled tool. PMD and XLint run
/// concurrently.
pub fn check_file(path: &Path, settings: &Settings) -> CheckReport {
    let target = absolute(path);
    let run = |enabled: bool, tool: Tool| enabled.then(|| run_one(tool, &target, settings));
    let (pmd, xlint) = rayon::join(
        || run(settings.do_pmd, Tool::Pmd),
        || run(settings.do_xlint, Tool::Xlint),
    );

    let mut report = CheckReport {
        file: target.clone(),
        ..CheckReport::default()
    };
    for (tool, outcome) in [(Tool::Pmd, pmd), (Tool::Xlint, xlint)] {
        match outcome {
            Some(Ok(mut diags)) => report.diagnostics.append(&mut diags),
            Some(Err(e)) => report.failures.push(to_failure(tool, e)),
            None => {}
        }
    }
    present::sort_diagnostics(&mut report.diagnostics);
    report
}

/// Expand files, directories, and glob patterns into `.java` files.
pub fn collect_targets(paths: &[String]) -> Vec<PathBuf> {
    let mut targets: Vec<PathBuf> = Vec::new();
    for p in paths {
        let path = PathBuf::from(p);
        let pattern = if path.is_dir() {
            path.join("**").join("*.java").to_string_lossy().to_string()
        } else if p.contains(['*', '?', '[']) {
            p.clone()
        } else {
            targets.push(path);
            continue;
        };
        match glob::glob(&pattern) {
            Ok(entries) => targets.extend(
                entries
                    .flatten()
                    .filter(|e| e.extension().is_some_and(|x| x == "java")),
            ),
            Err(e) => tracing::warn!("bad pattern '{}': {}", p, e),
        }
    }
    targets.sort();
    targets.dedup();
    targets
}

/// Check many files in parallel. Reports come back sorted by file.
pub fn check_paths(files: &[PathBuf], settings: &Settings) -> Vec<CheckReport> {
    let mut reports: Vec<CheckReport> = files
        .par_iter()
        .map(|f| check_file(f, settings))
        .collect();
    reports.sort_by(|a, b| a.file.cmp(&b.file));
    reports
}

/// Editor-facing runner: reloads settings per check, keeps the latest
/// result per file, and pushes it to a host.
pub struct Checker {
    cli: CliOverrides,
    store: ResultStore,
}

impl Checker {
    pub fn new(cli: CliOverrides) -> Checker {
        Checker {
            cli,
            store: ResultStore::new(),
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Settings for `file`, read fresh from disk.
    pub fn settings_for(&self, file: &Path) -> Result<Settings> {
        let mut cli = self.cli.clone();
        if cli.repo_root.is_none() {
            cli.repo_root = Some(absolute(file).to_string_lossy().to_string());
        }
        config::resolve_effective(&cli)
    }

    /// Check `file` and render the result unless a newer check for the same
    /// file started meanwhile. Returns the report either way.
    pub fn run(&self, file: &Path, host: &mut dyn Host) -> Result<CheckReport> {
        let ticket = self.store.begin(file);
        let settings = match self.settings_for(file) {
            Ok(s) => s,
            Err(e) => return Err(self.fail(&ticket, file, host, e)),
        };
        let report = check_file(file, &settings);
        let text = match fs::read_to_string(&report.file) {
            Ok(text) => text,
            Err(source) => {
                let e = CheckError::Io {
                    path: report.file.clone(),
                    source,
                };
                return Err(self.fail(&ticket, &report.file, host, e));
            }
        };
        let presentation = present::build_presentation(&report.file, &text, &report.diagnostics);
        self.store.commit_then(&ticket, presentation, |p| {
            present::render(host, p, &settings);
            for f in &report.failures {
                host.set_status(&report.file, &f.message);
            }
        });
        Ok(report)
    }

    /// Drop the previous result for a check that could not finish and show
    /// why.
    fn fail(&self, ticket: &Ticket, file: &Path, host: &mut dyn Host, err: CheckError) -> CheckError {
        let empty = Presentation {
            file: absolute(file),
            ..Presentation::default()
        };
        self.store.commit_then(ticket, empty, |p| {
            host.clear_regions(&p.file);
            host.set_status(&p.file, &err.to_string());
        });
        err
    }
}
