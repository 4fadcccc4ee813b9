use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::types::SandboxKind;

#[derive(Parser, Debug)]
#[clap(name = "scopebox")]
#[clap(version, about = "Global namespace isolation for co-resident modules")]
#[clap(propagate_version = true)]
pub struct Cli {
    #[clap(flatten)]
    pub global_opts: GlobalOpts,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Configuration file path
    #[clap(short, long, global = true, env = "SCOPEBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[clap(long, global = true, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a scenario file against a fresh global namespace
    Run(RunArgs),

    /// List sandbox kinds and whether this host can use them
    Backends(BackendsArgs),

    /// Show the keys every proxy sandbox writes through to the global namespace
    Whitelist(WhitelistArgs),

    /// Initialize a new scopebox configuration
    Init(InitArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

// ============================================================================
// Sandbox Commands
// ============================================================================

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario file (TOML)
    pub scenario: PathBuf,

    /// Sandbox kind for `create` steps that do not name one
    #[clap(long, short = 'k', value_enum)]
    pub kind: Option<SandboxKind>,

    /// Enable development diagnostics
    #[clap(long)]
    pub development: bool,

    /// Pretend the host cannot intercept property access
    #[clap(long)]
    pub no_interception: bool,
}

#[derive(Args, Debug)]
pub struct BackendsArgs {
    /// Pretend the host cannot intercept property access
    #[clap(long)]
    pub no_interception: bool,
}

#[derive(Args, Debug)]
pub struct WhitelistArgs {
    /// Include the development-only keys
    #[clap(long)]
    pub development: bool,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force overwrite existing configuration
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[clap(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
}

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "scopebox",
            "run",
            "scenario.toml",
            "--kind",
            "snapshot",
            "--development",
            "--format",
            "json",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.scenario, PathBuf::from("scenario.toml"));
                assert_eq!(args.kind, Some(SandboxKind::Snapshot));
                assert!(args.development);
                assert!(!args.no_interception);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(matches!(cli.global_opts.format, OutputFormat::Json));
    }
}
