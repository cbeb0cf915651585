//! External tool invocation.
//!
//! Builds PMD and `javac -Xlint` command lines from settings and runs them
//! with a bounded timeout. Both output streams are captured and combined,
//! stdout first.

use crate::config::Settings;
use crate::error::{CheckError, Result};
use crate::models::Tool;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_RULESET: &str = include_str!("../rulesets/default.xml");
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
/// A fully-built command line for one tool run.
pub struct ToolCommand {
    pub tool: Tool,
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Raw text produced by a tool plus its exit code (`None` when killed by a
/// signal).
pub struct ToolOutput {
    pub text: String,
    pub status: Option<i32>,
}

/// Ruleset argument for PMD.
///
/// `ruleset_path` wins; otherwise each entry of `rules` becomes
/// `rulesets/java/<rule>.xml` unless it already names a path. With neither
/// configured the bundled default ruleset is used.
pub fn resolve_rulesets(settings: &Settings) -> Result<String> {
    if let Some(path) = settings.ruleset_path.as_ref() {
        return Ok(path.clone());
    }
    if !settings.rules.is_empty() {
        let joined = settings
            .rules
            .iter()
            .map(|r| {
                if r.contains('/') || r.ends_with(".xml") {
                    r.clone()
                } else {
                    format!("rulesets/java/{}.xml", r)
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        return Ok(joined);
    }
    let path = default_ruleset_path()?;
    Ok(path.to_string_lossy().to_string())
}

/// Path of the bundled ruleset, written to a fresh temp file on first use.
///
/// The file is fully written before any caller sees its path and is never
/// rewritten for the rest of the process.
fn default_ruleset_path() -> Result<PathBuf> {
    static RULESET: OnceLock<std::result::Result<tempfile::TempPath, String>> = OnceLock::new();
    match RULESET.get_or_init(write_default_ruleset) {
        Ok(path) => Ok(path.to_path_buf()),
        Err(e) => Err(CheckError::Configuration(format!(
            "cannot write bundled ruleset: {}",
            e
        ))),
    }
}

fn write_default_ruleset() -> std::result::Result<tempfile::TempPath, String> {
    let mut file = tempfile::Builder::new()
        .prefix("jcheck-default-ruleset")
        .suffix(".xml")
        .tempfile()
        .map_err(|e| e.to_string())?;
    file.write_all(DEFAULT_RULESET.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| e.to_string())?;
    tracing::debug!(path = %file.path().display(), "wrote bundled ruleset");
    Ok(file.into_temp_path())
}

/// Join classpath-like entries with the platform separator.
fn join_classpath<I, S>(entries: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    std::env::join_paths(entries)
        .map(|s| s.to_string_lossy().to_string())
        .map_err(|e| CheckError::Configuration(format!("invalid classpath entry: {}", e)))
}

/// Build the PMD command for `file`.
///
/// With `pmd_home` set, PMD runs from its jars through `java`; otherwise the
/// `pmd` launcher is used.
pub fn pmd_command(file: &Path, settings: &Settings) -> Result<ToolCommand> {
    let rulesets = resolve_rulesets(settings)?;
    let target = file.to_string_lossy().to_string();
    let (program, args) = match settings.pmd_home.as_ref() {
        Some(home) => {
            let lib = home.join("lib");
            let pattern = lib.join("*.jar").to_string_lossy().to_string();
            let jars: Vec<PathBuf> = glob::glob(&pattern)
                .map_err(|e| CheckError::Configuration(format!("bad pmd_home: {}", e)))?
                .flatten()
                .collect();
            if jars.is_empty() {
                return Err(CheckError::Configuration(format!(
                    "no PMD jars found under {}",
                    lib.display()
                )));
            }
            let classpath = join_classpath(&jars)?;
            (
                settings.java_executable.clone(),
                vec![
                    "-classpath".to_string(),
                    classpath,
                    "net.sourceforge.pmd.PMD".to_string(),
                    "-d".to_string(),
                    target,
                    "-f".to_string(),
                    "text".to_string(),
                    "-R".to_string(),
                    rulesets,
                ],
            )
        }
        None => (
            settings.pmd_executable.clone(),
            vec![
                "check".to_string(),
                "--no-progress".to_string(),
                "--no-cache".to_string(),
                "-f".to_string(),
                "text".to_string(),
                "-d".to_string(),
                target,
                "-R".to_string(),
                rulesets,
            ],
        ),
    };
    Ok(ToolCommand {
        tool: Tool::Pmd,
        program,
        args,
        current_dir: Some(settings.repo_root.clone()),
    })
}

/// Build the `javac -Xlint` command for `file`, writing classes to `class_dir`.
pub fn xlint_command(file: &Path, settings: &Settings, class_dir: &Path) -> Result<ToolCommand> {
    let classpath = join_classpath(&settings.java_classpath)?;
    Ok(ToolCommand {
        tool: Tool::Xlint,
        program: settings.javac_executable.clone(),
        args: vec![
            "-g".to_string(),
            "-Xlint".to_string(),
            "-classpath".to_string(),
            classpath,
            "-d".to_string(),
            class_dir.to_string_lossy().to_string(),
            file.to_string_lossy().to_string(),
        ],
        current_dir: Some(settings.repo_root.clone()),
    })
}

/// Run PMD against `file`.
pub fn run_pmd(file: &Path, settings: &Settings) -> Result<ToolOutput> {
    let cmd = pmd_command(file, settings)?;
    run_tool(&cmd, settings.timeout)
}

/// Run `javac -Xlint` against `file`. Compiled classes go to a temporary
/// directory removed after the run.
pub fn run_xlint(file: &Path, settings: &Settings) -> Result<ToolOutput> {
    let class_dir = tempfile::Builder::new()
        .prefix("jcheck-classes")
        .tempdir()
        .map_err(|source| CheckError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
    let cmd = xlint_command(file, settings, class_dir.path())?;
    run_tool(&cmd, settings.timeout)
}

fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> Option<thread::JoinHandle<Vec<u8>>> {
    stream.map(|mut s| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = s.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Kill the tool and everything it started. Launchers such as the `pmd`
/// script fork the JVM instead of exec'ing it, so the whole process group
/// goes on unix.
fn kill(child: &mut Child) {
    #[cfg(unix)]
    {
        // The child leads its own group (see `run_tool`).
        let pgid = child.id() as libc::pid_t;
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } == -1 {
            let _ = child.kill();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Execute `cmd`, waiting at most `timeout`.
///
/// A missing executable is a configuration error. A non-zero exit with empty
/// output is a tool failure; non-zero with output is returned as-is since
/// both PMD and javac exit non-zero when they report findings.
pub fn run_tool(cmd: &ToolCommand, timeout: Duration) -> Result<ToolOutput> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cmd.current_dir.as_ref() {
        command.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    tracing::debug!(tool = %cmd.tool, program = %cmd.program, args = ?cmd.args, "spawning");

    let mut child = command.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => CheckError::Configuration(format!(
            "{} executable '{}' could not be started: {}",
            cmd.tool, cmd.program, e
        )),
        _ => CheckError::Io {
            path: PathBuf::from(&cmd.program),
            source: e,
        },
    })?;

    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() >= timeout {
                    tracing::warn!(tool = %cmd.tool, "timed out after {:?}; killing", timeout);
                    kill(&mut child);
                    return Err(CheckError::Timeout {
                        tool: cmd.tool,
                        after: timeout,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                kill(&mut child);
                return Err(CheckError::Io {
                    path: PathBuf::from(&cmd.program),
                    source,
                });
            }
        }
    };

    let mut bytes = collect(stdout);
    bytes.extend(collect(stderr));
    let text = String::from_utf8_lossy(&bytes).to_string();
    let code = status.code();
    tracing::debug!(tool = %cmd.tool, code = ?code, bytes = text.len(), "finished");

    if !status.success() && text.trim().is_empty() {
        return Err(CheckError::ToolExecution {
            tool: cmd.tool,
            code,
        });
    }
    Ok(ToolOutput { text, status: code })
}
