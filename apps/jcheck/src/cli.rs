//! CLI argument parsing via `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "jcheck",
    version,
    about = "Run PMD and javac -Xlint over Java sources",
    long_about = "jcheck — runs PMD and the compiler's lint mode against Java files and shows the findings as highlighted lines and a results list.\n\nConfiguration precedence: CLI > jcheck.toml > $JCHECK_SETTINGS > defaults.",
    after_help = "Examples:\n  jcheck check src/main/java/Foo.java\n  jcheck check src --tool pmd --rule basic --rule unusedcode\n  jcheck check 'src/**/*.java' --classpath /opt/lib/guava.jar --output json\n  jcheck watch src",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(long, short, global = true, help = "Enable debug logging")]
    pub verbose: bool,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ToolChoice {
    Pmd,
    Xlint,
    All,
}

impl ToolChoice {
    /// (do_pmd, do_xlint) overrides; `All` leaves settings in charge.
    pub fn toggles(self) -> (Option<bool>, Option<bool>) {
        match self {
            ToolChoice::Pmd => (Some(true), Some(false)),
            ToolChoice::Xlint => (Some(false), Some(true)),
            ToolChoice::All => (None, None),
        }
    }
}

#[derive(Args, Clone, Default)]
/// Flags shared by `check` and `watch`.
pub struct ToolArgs {
    #[arg(long, help = "Repository root (default: detected from the path)")]
    pub repo_root: Option<String>,
    #[arg(long, value_enum, help = "Which tool to run (default: per settings)")]
    pub tool: Option<ToolChoice>,
    #[arg(long, help = "PMD ruleset file (overrides ruleset_path)")]
    pub ruleset: Option<String>,
    #[arg(long = "rule", help = "PMD rule set name; repeatable (overrides rules)")]
    pub rules: Vec<String>,
    #[arg(long = "classpath", help = "Classpath entry for javac; repeatable (overrides java_classpath)")]
    pub classpath: Vec<String>,
    #[arg(long, help = "Per-tool timeout in seconds (default: 60)")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current jcheck version.")]
    Version,
    /// Check files once
    #[command(
        about = "Check Java files",
        long_about = "Run the enabled tools against each file and print findings. Exits 1 when any error is found, 2 when no tool could run.",
        after_help = "Examples:\n  jcheck check Foo.java\n  jcheck check src --output json"
    )]
    Check {
        #[arg(help = "Files, directories, or glob patterns (default: current dir)")]
        paths: Vec<String>,
        #[command(flatten)]
        tools: ToolArgs,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Re-check files on save
    #[command(
        about = "Watch and re-check on save",
        long_about = "Watch a directory and re-check each Java file when it is saved. A newer save of the same file supersedes a check still running."
    )]
    Watch {
        #[arg(help = "Directory to watch (default: current dir)")]
        dir: Option<String>,
        #[command(flatten)]
        tools: ToolArgs,
    },
    /// Show effective settings
    #[command(
        about = "Show effective settings",
        long_about = "Print the settings a check would use after applying precedence."
    )]
    Config {
        #[command(flatten)]
        tools: ToolArgs,
    },
}
