//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Default schema directory for pulls and pushes
pub const DEFAULT_OUT_DIR: &str = "component-schemas/";

/// sbx - Sync component schemas and presets between spaces
#[derive(Parser, Debug)]
#[command(name = "sbx")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub globals: GlobalArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Management API token
    #[arg(long, global = true, env = "SB_MGMT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Space to pull from
    #[arg(long, global = true, env = "SOURCE_SPACE_ID", allow_negative_numbers = true)]
    pub source_space: Option<i64>,

    /// Space to push to
    #[arg(long, global = true, env = "TARGET_SPACE_ID", allow_negative_numbers = true)]
    pub target_space: Option<i64>,

    /// Output directory for component schemas
    #[arg(long, global = true, env = "SBX_OUT_DIR", default_value = DEFAULT_OUT_DIR)]
    pub out: PathBuf,

    /// Config file (defaults to ./sbx.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Component selection shared by push and pull
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Component names or patterns
    pub names: Vec<String>,

    /// Name matching mode: exact, prefix, glob
    #[arg(long = "match", default_value = "exact")]
    pub match_mode: String,

    /// Select every component
    #[arg(long)]
    pub all: bool,

    /// Print planned actions without writing
    #[arg(long)]
    pub dry_run: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Upload component schemas and presets to a space
    ///
    /// Examples:
    ///   sbx push-components hero teaser
    ///   sbx push-components --match prefix hero --dry-run
    ///   sbx push-components --all --dir ./schemas
    PushComponents {
        #[command(flatten)]
        selection: Selection,

        /// Space ID to push to (defaults to TARGET_SPACE_ID)
        #[arg(long, allow_negative_numbers = true)]
        space: Option<i64>,

        /// Directory containing component schemas (defaults to --out)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Concurrent component workers (at most 4)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Download component schemas and presets from a space
    ///
    /// Examples:
    ///   sbx pull-components hero
    ///   sbx pull-components --all --dry-run
    PullComponents {
        #[command(flatten)]
        selection: Selection,

        /// Space ID to pull from (defaults to SOURCE_SPACE_ID)
        #[arg(long, allow_negative_numbers = true)]
        space: Option<i64>,
    },

    /// Show space settings and recommended rate limits
    SpaceInfo {
        /// Space ID (defaults to TARGET_SPACE_ID, then SOURCE_SPACE_ID)
        #[arg(long, allow_negative_numbers = true)]
        space: Option<i64>,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   sbx completion bash > ~/.local/share/bash-completion/completions/sbx
    ///   sbx completion zsh > ~/.zfunc/_sbx
    ///   sbx completion fish > ~/.config/fish/completions/sbx.fish
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_push_parses_selection() {
        let cli = Cli::try_parse_from([
            "sbx",
            "push-components",
            "hero",
            "teaser",
            "--match",
            "prefix",
            "--dry-run",
            "--space",
            "42",
        ])
        .unwrap();

        match cli.command {
            Commands::PushComponents { selection, space, dir, .. } => {
                assert_eq!(selection.names, vec!["hero", "teaser"]);
                assert_eq!(selection.match_mode, "prefix");
                assert!(selection.dry_run);
                assert!(!selection.all);
                assert_eq!(space, Some(42));
                assert_eq!(dir, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sbx", "pull-components", "--all", "--token", "abc", "--out", "schemas"]).unwrap();
        assert_eq!(cli.globals.token.as_deref(), Some("abc"));
        assert_eq!(cli.globals.out, PathBuf::from("schemas"));
    }

    #[test]
    fn test_negative_space_parses() {
        let cli = Cli::try_parse_from(["sbx", "space-info", "--space", "-3"]).unwrap();
        assert_eq!(cli.command, Commands::SpaceInfo { space: Some(-3) });
    }
}
