//! Output rendering for check results.
//!
//! Supports `human` (default) and `json` outputs. Human output goes through
//! [`TerminalHost`], the built-in [`Host`] implementation; the JSON form
//! includes per-file results and a top-level summary.

use crate::config::{HighlightStyle, Settings};
use crate::models::{CheckReport, Severity, Summary};
use crate::present::{self, Host, ListEntry, Region, RegionStyle, ERROR_SCOPE, WARNING_SCOPE};
use crate::utils;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

fn use_colors(output: &str) -> bool {
    output != "json" && utils::colors_enabled()
}

/// Host that prints the results pane to a writer.
pub struct TerminalHost<W: Write> {
    out: W,
    color: bool,
    base: std::path::PathBuf,
    marked: HashSet<&'static str>,
    style: Option<RegionStyle>,
}

impl<W: Write> TerminalHost<W> {
    pub fn new(out: W, color: bool, base: &Path) -> TerminalHost<W> {
        TerminalHost {
            out,
            color,
            base: base.to_path_buf(),
            marked: HashSet::new(),
            style: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint_source(&self, source: &str, severity: Severity) -> String {
        let Some(style) = self.style.filter(|_| self.color) else {
            return source.to_string();
        };
        match (style.style, severity) {
            (HighlightStyle::Fill, Severity::Error) => source.on_red().to_string(),
            (HighlightStyle::Fill, Severity::Warning) => source.on_yellow().to_string(),
            (HighlightStyle::Outline, Severity::Error) => source.red().underline().to_string(),
            (HighlightStyle::Outline, Severity::Warning) => source.yellow().underline().to_string(),
            (HighlightStyle::None, _) => source.to_string(),
        }
    }

    fn gutter(&self, severity: Severity) -> String {
        let scope = present::scope_for(severity);
        let marks = self.style.is_some_and(|s| s.gutter_marks);
        if !marks || !self.marked.contains(scope) {
            return " ".to_string();
        }
        match (severity, self.color) {
            (Severity::Error, true) => "✖".red().to_string(),
            (Severity::Error, false) => "✖".to_string(),
            (Severity::Warning, true) => "▲".yellow().to_string(),
            (Severity::Warning, false) => "▲".to_string(),
        }
    }
}

impl<W: Write> Host for TerminalHost<W> {
    fn clear_regions(&mut self, _file: &Path) {
        self.marked.clear();
        self.style = None;
    }

    fn render_regions(&mut self, _file: &Path, category: &str, _regions: &[Region], style: RegionStyle) {
        let scope = match category {
            ERROR_SCOPE => ERROR_SCOPE,
            _ => WARNING_SCOPE,
        };
        self.marked.insert(scope);
        self.style = Some(style);
    }

    fn show_list(&mut self, file: &Path, entries: &[ListEntry]) {
        let shown = utils::display_path(file, &self.base);
        let header = if self.color {
            format!("{}:", shown.bold())
        } else {
            format!("{}:", shown)
        };
        let _ = writeln!(self.out, "{}\n", header);
        if entries.is_empty() {
            let pass = present::format_results_pane(file, entries);
            let line = pass.lines().last().unwrap_or_default();
            if self.color {
                let _ = writeln!(self.out, "{}", line.green());
            } else {
                let _ = writeln!(self.out, "{}", line);
            }
        }
        for e in entries {
            let row = present::format_entry(e);
            // Paint only the source column so alignment stays intact.
            let split = row.find(": ").map(|i| i + 2).unwrap_or(0);
            let (num, rest) = row.split_at(split);
            let source_len = rest.len().saturating_sub(e.message.len());
            let (source, message) = rest.split_at(source_len);
            let _ = writeln!(
                self.out,
                "{}{}{}{}",
                self.gutter(e.severity),
                num,
                self.paint_source(source, e.severity),
                message
            );
        }
        let _ = writeln!(self.out);
    }

    fn set_status(&mut self, _file: &Path, message: &str) {
        let _ = writeln!(self.out, "{} {}", utils::error_prefix(), message);
    }
}

/// Print check results in the requested format.
pub fn print_check(reports: &[CheckReport], settings: &Settings) {
    match settings.output.as_str() {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_check_json(reports)).unwrap_or_default()
        ),
        _ => {
            let color = use_colors(&settings.output);
            let stdout = std::io::stdout();
            let mut host = TerminalHost::new(stdout.lock(), color, &settings.repo_root);
            for r in reports {
                let text = fs::read_to_string(&r.file).unwrap_or_default();
                let p = present::build_presentation(&r.file, &text, &r.diagnostics);
                present::render(&mut host, &p, settings);
                for f in &r.failures {
                    host.set_status(&r.file, &format!("[{}] {}", f.tool, f.message));
                }
            }
            let mut out = host.into_inner();
            let _ = writeln!(out, "{}", compose_summary_line(&Summary::from_reports(reports), color));
        }
    }
}

fn compose_summary_line(s: &Summary, color: bool) -> String {
    let line = format!(
        "— Summary — errors={} warnings={} files={} failures={}",
        s.errors, s.warnings, s.files, s.failures
    );
    if color {
        line.bold().to_string()
    } else {
        line
    }
}

/// Compose check JSON object (pure) for testing/snapshot purposes.
pub fn compose_check_json(reports: &[CheckReport]) -> JsonVal {
    json!({
        "results": serde_json::to_value(reports).unwrap_or(JsonVal::Null),
        "summary": serde_json::to_value(Summary::from_reports(reports)).unwrap_or(JsonVal::Null),
    })
}

/// Print the effective settings.
pub fn print_settings(settings: &Settings) {
    let rulesets = crate::invoke::resolve_rulesets(settings)
        .unwrap_or_else(|e| format!("<{}>", e));
    let out = json!({
        "repo_root": settings.repo_root,
        "settings_file": settings.settings_file,
        "rulesets": rulesets,
        "java_classpath": settings.java_classpath,
        "do_pmd": settings.do_pmd,
        "do_xlint": settings.do_xlint,
        "pmd_executable": settings.pmd_executable,
        "pmd_home": settings.pmd_home,
        "java_executable": settings.java_executable,
        "javac_executable": settings.javac_executable,
        "timeout_secs": settings.timeout.as_secs(),
        "highlight": settings.highlight,
        "gutter_marks": settings.gutter_marks,
        "results_pane": settings.results_pane,
        "check_on_save": settings.check_on_save,
        "output": settings.output,
    });
    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
}
