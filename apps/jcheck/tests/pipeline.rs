//! End-to-end checks against stand-in tool scripts.
#![cfg(unix)]

use jcheck::check::{check_file, Checker};
use jcheck::config::{resolve_with, CliOverrides};
use jcheck::models::{FailureKind, Severity, Tool};
use jcheck::present::{Host, ListEntry, Region, RegionStyle, ERROR_SCOPE, WARNING_SCOPE};
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const SOURCE: &str = "class Foo {\n  java.util.List xs;\n  void f() { try { g(); } catch (Exception e) {} }\n}\n";

// Both stand-ins receive the target file as their 7th argument.
const FAKE_PMD: &str = r#"#!/bin/sh
printf '%s:3:\tEmptyCatchBlock:\tAvoid empty catch blocks\n' "$7"
printf '/elsewhere/Bar.java:1:\tUnusedPrivateField:\tAvoid unused private fields\n'
printf 'not a finding\n'
exit 4
"#;

const FAKE_JAVAC: &str = r#"#!/bin/sh
{
  printf '%s:2: warning: [rawtypes] found raw type: List\n' "$7"
  printf '  java.util.List xs;\n'
  printf '           ^\n'
  printf '  missing type arguments for generic class List<E>\n'
  printf '1 warning\n'
} 1>&2
exit 0
"#;

// Forks instead of exec'ing, like the stock `pmd` launcher does with the JVM.
const SLOW_JAVAC: &str = "#!/bin/sh\nsleep 10\ntrue\n";

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn project(javac_body: &str, extra: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let pmd = script(dir.path(), "fake-pmd", FAKE_PMD);
    let javac = script(dir.path(), "fake-javac", javac_body);
    fs::write(
        dir.path().join("jcheck.toml"),
        format!(
            "pmd_executable = \"{}\"\njavac_executable = \"{}\"\nruleset_path = \"rules.xml\"\n{}\n[severity]\nEmptyCatchBlock = \"error\"\n",
            pmd.display(),
            javac.display(),
            extra
        ),
    )
    .unwrap();
    let file = dir.path().join("Foo.java");
    fs::write(&file, SOURCE).unwrap();
    (dir, file)
}

fn cli(root: &Path) -> CliOverrides {
    CliOverrides {
        repo_root: Some(root.to_string_lossy().to_string()),
        ..CliOverrides::default()
    }
}

#[derive(Default)]
struct RecordingHost {
    regions: HashMap<String, Vec<Region>>,
    lists: Vec<Vec<ListEntry>>,
    statuses: Vec<String>,
}

impl Host for RecordingHost {
    fn clear_regions(&mut self, _file: &Path) {
        self.regions.clear();
    }
    fn render_regions(&mut self, _file: &Path, category: &str, regions: &[Region], _style: RegionStyle) {
        self.regions.insert(category.to_string(), regions.to_vec());
    }
    fn show_list(&mut self, _file: &Path, entries: &[ListEntry]) {
        self.lists.push(entries.to_vec());
    }
    fn set_status(&mut self, _file: &Path, message: &str) {
        self.statuses.push(message.to_string());
    }
}

#[test]
fn check_collects_both_tools_for_the_target_only() {
    let (dir, file) = project(FAKE_JAVAC, "");
    let settings = resolve_with(&cli(dir.path()), None).unwrap();
    let report = check_file(&file, &settings);

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    let got: Vec<(usize, Severity, Tool)> = report
        .diagnostics
        .iter()
        .map(|d| (d.line, d.severity, d.tool))
        .collect();
    assert_eq!(
        got,
        vec![
            (2, Severity::Warning, Tool::Xlint),
            (3, Severity::Error, Tool::Pmd)
        ]
    );
    assert_eq!(report.diagnostics[0].column, Some(11));
    assert_eq!(
        report.diagnostics[0].message,
        "found raw type: List; missing type arguments for generic class List<E>"
    );
    assert_eq!(report.diagnostics[1].rule.as_deref(), Some("EmptyCatchBlock"));
}

#[test]
fn rerunning_replaces_previous_results() {
    let (dir, file) = project(FAKE_JAVAC, "");
    let checker = Checker::new(cli(dir.path()));
    let mut host = RecordingHost::default();

    checker.run(&file, &mut host).unwrap();
    checker.run(&file, &mut host).unwrap();

    assert_eq!(host.lists.len(), 2);
    assert_eq!(host.lists[0], host.lists[1]);
    assert_eq!(host.lists[1].len(), 2);
    assert_eq!(host.regions[ERROR_SCOPE].len(), 1);
    assert_eq!(host.regions[WARNING_SCOPE].len(), 1);

    assert_eq!(checker.store().len(), 1);
    let stored = checker.store().get(&file).unwrap();
    assert_eq!(stored.entries.len(), 2);
    // Cursor on line 3 shows the PMD message.
    let line3 = SOURCE.find("  void f()").unwrap() + 4;
    assert_eq!(
        checker.store().message_at(&file, line3).as_deref(),
        Some("Avoid empty catch blocks")
    );
}

#[test]
fn slow_tool_times_out_without_losing_the_other() {
    let (dir, file) = project(SLOW_JAVAC, "timeout_secs = 1");
    let settings = resolve_with(&cli(dir.path()), None).unwrap();
    let started = std::time::Instant::now();
    let report = check_file(&file, &settings);
    assert!(started.elapsed() < std::time::Duration::from_secs(8));

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].tool, Tool::Xlint);
    assert_eq!(report.failures[0].kind, FailureKind::Timeout);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].tool, Tool::Pmd);
}

#[test]
fn failed_recheck_clears_previous_results() {
    let (dir, file) = project(FAKE_JAVAC, "");
    let checker = Checker::new(cli(dir.path()));
    let mut host = RecordingHost::default();

    checker.run(&file, &mut host).unwrap();
    assert_eq!(host.regions.len(), 2);

    fs::write(dir.path().join("jcheck.toml"), "rules = [unterminated").unwrap();
    assert!(checker.run(&file, &mut host).is_err());

    assert!(host.regions.is_empty());
    assert!(host.statuses.last().unwrap().contains("jcheck.toml"));
    let line3 = SOURCE.find("  void f()").unwrap() + 4;
    assert_eq!(checker.store().message_at(&file, line3), None);
    assert!(checker.store().get(&file).unwrap().entries.is_empty());
}

#[test]
fn missing_executable_reports_configuration_error_to_host() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("jcheck.toml"),
        "do_pmd = false\njavac_executable = \"/nonexistent/jcheck-javac\"\n",
    )
    .unwrap();
    let file = dir.path().join("Foo.java");
    fs::write(&file, SOURCE).unwrap();

    let checker = Checker::new(cli(dir.path()));
    let mut host = RecordingHost::default();
    let report = checker.run(&file, &mut host).unwrap();

    assert!(report.diagnostics.is_empty());
    assert_eq!(report.failures[0].kind, FailureKind::Configuration);
    assert_eq!(host.lists, vec![Vec::<ListEntry>::new()]);
    assert_eq!(host.statuses.len(), 1);
    assert!(host.statuses[0].contains("jcheck-javac"));
}
