//! jcheck CLI binary entry point.
//! Delegates to the library for checking and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use jcheck::check::{self, Checker};
use jcheck::cli::{Cli, Commands, ToolArgs};
use jcheck::config::{self, CliOverrides};
use jcheck::models::{FailureKind, Summary};
use jcheck::output::{self, TerminalHost};
use jcheck::{utils, watch};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

fn overrides(tools: ToolArgs, output: Option<String>) -> CliOverrides {
    let (do_pmd, do_xlint) = tools.tool.map(|t| t.toggles()).unwrap_or((None, None));
    CliOverrides {
        repo_root: tools.repo_root,
        ruleset_path: tools.ruleset,
        rules: tools.rules,
        java_classpath: tools.classpath,
        do_pmd,
        do_xlint,
        timeout_secs: tools.timeout,
        output,
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli.cmd) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", utils::error_prefix(), e);
            std::process::exit(2);
        }
    }
}

fn run(cmd: Commands) -> Result<i32> {
    match cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        Commands::Check {
            paths,
            tools,
            output,
        } => {
            let paths = if paths.is_empty() {
                vec![".".to_string()]
            } else {
                paths
            };
            let mut cli = overrides(tools, output);
            if cli.repo_root.is_none() {
                cli.repo_root = Some(paths[0].clone());
            }
            let settings = config::resolve_effective(&cli).context("loading settings")?;
            if settings.settings_file.is_none() && settings.output != "json" {
                eprintln!(
                    "{} No jcheck.toml found; using defaults.",
                    utils::note_prefix()
                );
            }
            if !settings.do_pmd && !settings.do_xlint {
                eprintln!(
                    "{} Both do_pmd and do_xlint are disabled; nothing to run.",
                    utils::note_prefix()
                );
            }
            let files = check::collect_targets(&paths);
            if files.is_empty() {
                eprintln!("{} No Java files matched.", utils::info_prefix());
                return Ok(0);
            }
            let reports = check::check_paths(&files, &settings);
            output::print_check(&reports, &settings);

            let summary = Summary::from_reports(&reports);
            let all_unconfigured = reports.iter().all(|r| {
                !r.failures.is_empty()
                    && r.diagnostics.is_empty()
                    && r.failures.iter().all(|f| f.kind == FailureKind::Configuration)
            });
            if (settings.do_pmd || settings.do_xlint) && all_unconfigured {
                return Ok(2);
            }
            Ok(if summary.errors > 0 { 1 } else { 0 })
        }
        Commands::Watch { dir, tools } => {
            let dir = PathBuf::from(dir.unwrap_or_else(|| ".".to_string()));
            let dir = utils::absolute(&dir);
            let cli = overrides(tools, None);
            let settings = config::resolve_effective(&CliOverrides {
                repo_root: Some(dir.to_string_lossy().to_string()),
                ..cli.clone()
            })
            .context("loading settings")?;
            let color = utils::colors_enabled();
            let host = Arc::new(Mutex::new(TerminalHost::new(
                std::io::stdout(),
                color,
                &settings.repo_root,
            )));
            eprintln!(
                "{} Watching {} (Ctrl+C to stop)",
                utils::info_prefix(),
                dir.display()
            );
            watch::run_watch(&dir, Arc::new(Checker::new(cli)), host)
                .context("watching for changes")?;
            Ok(0)
        }
        Commands::Config { tools } => {
            let settings =
                config::resolve_effective(&overrides(tools, None)).context("loading settings")?;
            output::print_settings(&settings);
            Ok(0)
        }
    }
}
