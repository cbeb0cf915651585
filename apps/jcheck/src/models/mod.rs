//! Shared data models for diagnostics, tool failures, and check reports.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
/// Severity of a finding. `Error` sorts before `Warning`.
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Parse a severity token from settings (`error`, `warning`, `warn`).
    pub fn from_token(s: &str) -> Option<Severity> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Severity::Error),
            "warning" | "warn" => Some(Severity::Warning),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
/// External tool a diagnostic came from.
pub enum Tool {
    Pmd,
    Xlint,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Pmd => "pmd",
            Tool::Xlint => "xlint",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
/// A single reported issue.
pub struct Diagnostic {
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// 0-based column from the compiler's caret marker, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub severity: Severity,
    pub message: String,
    pub tool: Tool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Configuration,
    Execution,
    Timeout,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
/// A tool run that produced no usable output.
pub struct ToolFailure {
    pub tool: Tool,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Serialize, Debug, Clone, Default)]
/// Findings for one checked file.
pub struct CheckReport {
    pub file: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<ToolFailure>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
/// Aggregated counts used by printers.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub files: usize,
    pub failures: usize,
}

impl Summary {
    pub fn from_reports(reports: &[CheckReport]) -> Summary {
        let mut s = Summary {
            files: reports.len(),
            ..Summary::default()
        };
        for r in reports {
            for d in &r.diagnostics {
                match d.severity {
                    Severity::Error => s.errors += 1,
                    Severity::Warning => s.warnings += 1,
                }
            }
            s.failures += r.failures.len();
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(severity: Severity) -> Diagnostic {
        Diagnostic {
            file: PathBuf::from("Foo.java"),
            line: 1,
            column: None,
            severity,
            message: "m".into(),
            tool: Tool::Pmd,
            rule: None,
        }
    }

    #[test]
    fn test_severity_orders_errors_first() {
        assert!(Severity::Error < Severity::Warning);
        assert_eq!(Severity::from_token("WARN"), Some(Severity::Warning));
        assert_eq!(Severity::from_token("fatal"), None);
    }

    #[test]
    fn test_summary_counts_reports() {
        let reports = vec![
            CheckReport {
                file: "a".into(),
                diagnostics: vec![diag(Severity::Error), diag(Severity::Warning)],
                failures: vec![],
            },
            CheckReport {
                file: "b".into(),
                diagnostics: vec![diag(Severity::Warning)],
                failures: vec![ToolFailure {
                    tool: Tool::Xlint,
                    kind: FailureKind::Timeout,
                    message: "t".into(),
                }],
            },
        ];
        let s = Summary::from_reports(&reports);
        assert_eq!(
            s,
            Summary {
                errors: 1,
                warnings: 2,
                files: 2,
                failures: 1
            }
        );
    }

    #[test]
    fn test_diagnostic_json_omits_missing_column() {
        let v = serde_json::to_value(diag(Severity::Warning)).unwrap();
        assert_eq!(v["severity"], "warning");
        assert_eq!(v["tool"], "pmd");
        assert!(v.get("column").is_none());
    }
}
