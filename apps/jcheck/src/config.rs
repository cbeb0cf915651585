//! Settings discovery and effective settings resolution.
//!
//! jcheck reads `jcheck.toml|yaml|yml` from the repository root (or closest
//! ancestor) and layers it over an optional user settings file named by
//! `$JCHECK_SETTINGS`. CLI flags win over both.
//! Defaults:
//! - `java_classpath`: `["."]`
//! - `do_pmd`, `do_xlint`: true
//! - `pmd_executable`: `pmd`; `java_executable`: `java`; `javac_executable`: `javac`
//! - `timeout_secs`: 60
//! - `highlight`: true, `highlight_style`: `outline`, `gutter_marks`: true
//! - `results_pane`: true, `check_on_save`: true, `output`: `human`
//!
//! Overrides precedence: CLI > project file > user file > defaults.

use crate::error::{CheckError, Result};
use crate::models::Severity;
use crate::utils;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_ENV: &str = "JCHECK_SETTINGS";
const SETTINGS_FILES: [&str; 3] = ["jcheck.toml", "jcheck.yaml", "jcheck.yml"];

#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
/// One settings layer as stored on disk. Every key is optional so layers
/// can be merged.
pub struct SettingsFile {
    pub ruleset_path: Option<String>,
    pub rules: Option<Vec<String>>,
    pub java_classpath: Option<Vec<String>>,
    pub do_pmd: Option<bool>,
    pub do_xlint: Option<bool>,
    pub pmd_executable: Option<String>,
    pub pmd_home: Option<String>,
    pub java_executable: Option<String>,
    pub javac_executable: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Rule name -> error|warning
    pub severity: Option<HashMap<String, String>>,
    pub highlight: Option<bool>,
    pub highlight_style: Option<String>,
    pub gutter_marks: Option<bool>,
    pub results_pane: Option<bool>,
    #[serde(alias = "pmd_on_save")]
    pub check_on_save: Option<bool>,
    pub output: Option<String>,
}

impl SettingsFile {
    /// Fill unset keys of `self` from `lower`.
    pub fn over(self, lower: SettingsFile) -> SettingsFile {
        SettingsFile {
            ruleset_path: self.ruleset_path.or(lower.ruleset_path),
            rules: self.rules.or(lower.rules),
            java_classpath: self.java_classpath.or(lower.java_classpath),
            do_pmd: self.do_pmd.or(lower.do_pmd),
            do_xlint: self.do_xlint.or(lower.do_xlint),
            pmd_executable: self.pmd_executable.or(lower.pmd_executable),
            pmd_home: self.pmd_home.or(lower.pmd_home),
            java_executable: self.java_executable.or(lower.java_executable),
            javac_executable: self.javac_executable.or(lower.javac_executable),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
            severity: self.severity.or(lower.severity),
            highlight: self.highlight.or(lower.highlight),
            highlight_style: self.highlight_style.or(lower.highlight_style),
            gutter_marks: self.gutter_marks.or(lower.gutter_marks),
            results_pane: self.results_pane.or(lower.results_pane),
            check_on_save: self.check_on_save.or(lower.check_on_save),
            output: self.output.or(lower.output),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How highlighted regions are drawn.
pub enum HighlightStyle {
    Fill,
    Outline,
    None,
}

impl HighlightStyle {
    /// Unknown values fall back to `Outline`.
    pub fn from_token(s: &str) -> HighlightStyle {
        match s {
            "fill" => HighlightStyle::Fill,
            "none" => HighlightStyle::None,
            _ => HighlightStyle::Outline,
        }
    }
}

#[derive(Debug, Default, Clone)]
/// Flags given on the command line.
pub struct CliOverrides {
    pub repo_root: Option<String>,
    pub ruleset_path: Option<String>,
    pub rules: Vec<String>,
    pub java_classpath: Vec<String>,
    pub do_pmd: Option<bool>,
    pub do_xlint: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub output: Option<String>,
}

impl CliOverrides {
    fn as_layer(&self) -> SettingsFile {
        SettingsFile {
            ruleset_path: self.ruleset_path.clone(),
            rules: (!self.rules.is_empty()).then(|| self.rules.clone()),
            java_classpath: (!self.java_classpath.is_empty()).then(|| self.java_classpath.clone()),
            do_pmd: self.do_pmd,
            do_xlint: self.do_xlint,
            timeout_secs: self.timeout_secs,
            output: self.output.clone(),
            ..SettingsFile::default()
        }
    }
}

#[derive(Debug, Clone)]
/// Fully-resolved settings used by a check run.
pub struct Settings {
    pub repo_root: PathBuf,
    pub settings_file: Option<PathBuf>,
    pub ruleset_path: Option<String>,
    pub rules: Vec<String>,
    pub java_classpath: Vec<String>,
    pub do_pmd: bool,
    pub do_xlint: bool,
    pub pmd_executable: String,
    pub pmd_home: Option<PathBuf>,
    pub java_executable: String,
    pub javac_executable: String,
    pub timeout: Duration,
    pub severity: HashMap<String, Severity>,
    pub highlight: bool,
    pub highlight_style: HighlightStyle,
    pub gutter_marks: bool,
    pub results_pane: bool,
    pub check_on_save: bool,
    pub output: String,
}

impl Settings {
    /// Settings built purely from defaults, rooted at `repo_root`.
    pub fn defaults(repo_root: &Path) -> Settings {
        Settings::build(
            repo_root.to_path_buf(),
            None,
            SettingsFile::default(),
            HashMap::new(),
        )
    }

    fn from_layer(
        repo_root: PathBuf,
        settings_file: Option<PathBuf>,
        mut layer: SettingsFile,
    ) -> Result<Settings> {
        let mut severity = HashMap::new();
        for (rule, token) in layer.severity.take().unwrap_or_default() {
            let sev = Severity::from_token(&token).ok_or_else(|| {
                CheckError::Configuration(format!(
                    "severity for rule '{}' must be error or warning, got '{}'",
                    rule, token
                ))
            })?;
            severity.insert(rule, sev);
        }
        if layer.timeout_secs == Some(0) {
            return Err(CheckError::Configuration(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(Settings::build(repo_root, settings_file, layer, severity))
    }

    fn build(
        repo_root: PathBuf,
        settings_file: Option<PathBuf>,
        layer: SettingsFile,
        severity: HashMap<String, Severity>,
    ) -> Settings {
        Settings {
            repo_root,
            settings_file,
            ruleset_path: layer.ruleset_path.filter(|s| !s.trim().is_empty()),
            rules: layer.rules.unwrap_or_default(),
            java_classpath: layer
                .java_classpath
                .filter(|cp| !cp.is_empty())
                .unwrap_or_else(|| vec![".".to_string()]),
            do_pmd: layer.do_pmd.unwrap_or(true),
            do_xlint: layer.do_xlint.unwrap_or(true),
            pmd_executable: layer.pmd_executable.unwrap_or_else(|| "pmd".into()),
            pmd_home: layer.pmd_home.map(PathBuf::from),
            java_executable: layer.java_executable.unwrap_or_else(|| "java".into()),
            javac_executable: layer.javac_executable.unwrap_or_else(|| "javac".into()),
            timeout: Duration::from_secs(layer.timeout_secs.unwrap_or(60)),
            severity,
            highlight: layer.highlight.unwrap_or(true),
            highlight_style: layer
                .highlight_style
                .as_deref()
                .map(HighlightStyle::from_token)
                .unwrap_or(HighlightStyle::Outline),
            gutter_marks: layer.gutter_marks.unwrap_or(true),
            results_pane: layer.results_pane.unwrap_or(true),
            check_on_save: layer.check_on_save.unwrap_or(true),
            output: layer.output.unwrap_or_else(|| "human".into()),
        }
    }
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `jcheck.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let start = if !start.is_dir() {
        start.parent().unwrap_or(start)
    } else {
        start
    };
    let mut cur = start;
    loop {
        if SETTINGS_FILES.iter().any(|f| cur.join(f).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Path of the project settings file under `root`, if one exists.
pub fn find_settings_file(root: &Path) -> Option<PathBuf> {
    SETTINGS_FILES
        .iter()
        .map(|f| root.join(f))
        .find(|p| p.is_file())
}

/// Parse a settings file, choosing TOML or YAML by extension.
pub fn load_settings_file(path: &Path) -> Result<SettingsFile> {
    let s = fs::read_to_string(path).map_err(|source| CheckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&s).map_err(|e| {
            CheckError::Configuration(format!("{} is not valid YAML: {}", path.display(), e))
        })
    } else {
        toml::from_str(&s).map_err(|e| {
            CheckError::Configuration(format!("{} is not valid TOML: {}", path.display(), e))
        })
    }
}

/// Resolve `Settings` from CLI flags, the project file, and the user file
/// named by `$JCHECK_SETTINGS`.
pub fn resolve_effective(cli: &CliOverrides) -> Result<Settings> {
    let user = std::env::var_os(SETTINGS_ENV).map(PathBuf::from);
    resolve_with(cli, user.as_deref())
}

/// Same as [`resolve_effective`] with an explicit user settings path.
pub fn resolve_with(cli: &CliOverrides, user_settings: Option<&Path>) -> Result<Settings> {
    let cwd = std::env::current_dir().map_err(|source| CheckError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    resolve_in(cli, user_settings, &cwd)
}

/// Absolute directory to begin the root search from. Glob patterns start
/// at their literal leading directories.
fn search_start(raw: &str, cwd: &Path) -> PathBuf {
    let mut literal = PathBuf::new();
    for comp in Path::new(raw).components() {
        let part = comp.as_os_str().to_string_lossy();
        if part.contains(['*', '?', '[']) {
            break;
        }
        if comp != std::path::Component::CurDir {
            literal.push(comp);
        }
    }
    utils::absolute_in(&literal, cwd)
}

fn resolve_in(cli: &CliOverrides, user_settings: Option<&Path>, cwd: &Path) -> Result<Settings> {
    let start = search_start(cli.repo_root.as_deref().unwrap_or("."), cwd);
    let repo_root = detect_repo_root(&start);

    let project_path = find_settings_file(&repo_root);
    let project = match project_path.as_deref() {
        Some(p) => load_settings_file(p)?,
        None => SettingsFile::default(),
    };
    let user = match user_settings {
        Some(p) if p.is_file() => load_settings_file(p)?,
        Some(p) => {
            tracing::warn!("user settings file {} does not exist", p.display());
            SettingsFile::default()
        }
        None => SettingsFile::default(),
    };
    tracing::debug!(
        root = %repo_root.display(),
        project = ?project_path,
        "resolved settings layers"
    );
    let layer = cli.as_layer().over(project).over(user);
    Settings::from_layer(repo_root, project_path, layer)
}
