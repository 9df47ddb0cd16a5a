//! Clap derive structures for the `hechte` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use hechte_core::Timeline;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hechte -- watch microblog timelines from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "hechte",
    version,
    about = "Watch microblog timelines from the terminal",
    long_about = "Polls the friends, replies, or public timeline of a microblogging\n\
        service and prints new messages as they arrive.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "HECHTE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Account username (overrides profile)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Service root URL (overrides profile)
    #[arg(long, env = "HECHTE_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "HECHTE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Shared Enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// One readable line per message
    Plain,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Clap value parser for timeline names.
fn parse_timeline(raw: &str) -> Result<Timeline, String> {
    Timeline::from_name(raw).map_err(|e| e.to_string())
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll a timeline and print new messages as they arrive
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Fetch a timeline once and print it, oldest first
    #[command(alias = "f")]
    Fetch(FetchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH / FETCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
#[command(after_help = "While watching, type friends, replies, everyone or quit and press Enter.")]
pub struct WatchArgs {
    /// Timeline to start on: friends, replies or everyone
    #[arg(long, short = 't', value_parser = parse_timeline)]
    pub timeline: Option<Timeline>,

    /// Seconds between polls
    #[arg(long, short = 'f', value_parser = clap::value_parser!(u64).range(1..))]
    pub frequency: Option<u64>,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Timeline to fetch: friends, replies or everyone
    #[arg(long, short = 't', value_parser = parse_timeline)]
    pub timeline: Option<Timeline>,

    /// Output format
    #[arg(long, short = 'o', default_value = "plain")]
    pub output: OutputFormat,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current configuration (passwords redacted)
    Show,

    /// Set a value on the active profile
    Set {
        /// One of: base_url, username, timeline, frequency, timeout
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the profile's password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
