//! Line-oriented parsers for PMD text reports and `javac -Xlint` output.
//!
//! Lines that do not match a tool's pattern are dropped. The parsers never
//! fail; a clean run yields an empty vector.

use crate::models::{Diagnostic, Severity, Tool};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn pmd_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<path>.+?\.java):(?P<line>\d+)(?::[ \t]*|[ \t]+)(?:(?P<rule>[A-Z][A-Za-z0-9]*):\t+)?(?P<message>.*\S)\s*$",
        )
        .expect("PMD pattern compiles")
    })
}

fn xlint_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<path>.*\.java):(?P<line>\d+): (?:(?P<level>error|warning): )?(?:\[(?P<lint>[\w-]+)\] )?(?P<message>.*)$",
        )
        .expect("XLint pattern compiles")
    })
}

fn xlint_mark_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<mark>\s*)\^\s*$").expect("mark pattern compiles")
    })
}

fn xlint_trailer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d+ (?:errors?|warnings?)$|^Note: ")
            .expect("trailer pattern compiles")
    })
}

/// Parse a positive 1-based line number; `None` for 0 or overflow.
fn line_number(s: &str) -> Option<usize> {
    s.parse::<usize>().ok().filter(|n| *n > 0)
}

/// Dispatch on the originating tool.
pub fn parse_output(tool: Tool, text: &str, severity: &HashMap<String, Severity>) -> Vec<Diagnostic> {
    match tool {
        Tool::Pmd => parse_pmd(text, severity),
        Tool::Xlint => parse_xlint(text),
    }
}

/// Parse PMD's `text` report.
///
/// Accepts `path:line:<ws>message` and the newer
/// `path:line:\tRule:\tmessage` form. Older PMD drops the colon after the
/// line number (`path:line\tmessage`). Severity comes from the `severity`
/// map when the report names the rule; otherwise warning.
pub fn parse_pmd(text: &str, severity: &HashMap<String, Severity>) -> Vec<Diagnostic> {
    let re = pmd_re();
    let mut out = Vec::new();
    for raw in text.lines() {
        let Some(caps) = re.captures(raw) else {
            if !raw.trim().is_empty() {
                tracing::trace!(line = raw, "pmd: skipped");
            }
            continue;
        };
        let Some(line) = line_number(&caps["line"]) else {
            continue;
        };
        let rule = caps.name("rule").map(|m| m.as_str().to_string());
        let sev = rule
            .as_ref()
            .and_then(|r| severity.get(r).copied())
            .unwrap_or(Severity::Warning);
        out.push(Diagnostic {
            file: PathBuf::from(&caps["path"]),
            line,
            column: None,
            severity: sev,
            message: caps["message"].trim().to_string(),
            tool: Tool::Pmd,
            rule,
        });
    }
    out
}

enum XlintState {
    Idle,
    AwaitingMark,
    Collecting,
}

/// Parse `javac -Xlint` output.
///
/// Each finding starts with a `path:line:` header, followed by the echoed
/// source line and a caret line whose indentation gives the column. Extra
/// lines up to the next header are appended to the message with `"; "`.
pub fn parse_xlint(text: &str) -> Vec<Diagnostic> {
    let header = xlint_header_re();
    let mark = xlint_mark_re();
    let trailer = xlint_trailer_re();

    let mut out: Vec<Diagnostic> = Vec::new();
    let mut state = XlintState::Idle;
    for raw in text.lines() {
        if let Some(caps) = header.captures(raw) {
            match line_number(&caps["line"]) {
                Some(line) => {
                    let severity = match caps.name("level").map(|m| m.as_str()) {
                        Some("warning") => Severity::Warning,
                        _ => Severity::Error,
                    };
                    out.push(Diagnostic {
                        file: PathBuf::from(&caps["path"]),
                        line,
                        column: None,
                        severity,
                        message: caps["message"].trim().to_string(),
                        tool: Tool::Xlint,
                        rule: caps.name("lint").map(|m| m.as_str().to_string()),
                    });
                    state = XlintState::AwaitingMark;
                }
                None => state = XlintState::Idle,
            }
            continue;
        }
        if trailer.is_match(raw) {
            state = XlintState::Idle;
            continue;
        }
        match state {
            XlintState::Idle => {}
            XlintState::AwaitingMark => {
                if let Some(caps) = mark.captures(raw) {
                    if let Some(last) = out.last_mut() {
                        last.column = Some(caps["mark"].chars().count());
                    }
                    state = XlintState::Collecting;
                }
            }
            XlintState::Collecting => {
                let extra = raw.trim();
                if !extra.is_empty() {
                    if let Some(last) = out.last_mut() {
                        last.message.push_str("; ");
                        last.message.push_str(extra);
                    }
                }
            }
        }
    }
    out
}

/// Whether `reported` (as printed by a tool) names the same file as
/// `target`. Relative paths resolve against `base`.
pub fn same_file(reported: &Path, target: &Path, base: &Path) -> bool {
    let resolve = |p: &Path| -> PathBuf {
        let abs = if p.is_absolute() {
            p.to_path_buf()
        } else {
            base.join(p)
        };
        abs.canonicalize().unwrap_or_else(|_| normalize(&abs))
    };
    resolve(reported) == resolve(target)
}

/// Lexically remove `.` and `..` components.
fn normalize(p: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for c in p.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
