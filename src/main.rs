use clap::Parser;

use scopebox::cli::args::{Cli, Commands};
use scopebox::cli::commands;
use scopebox::config::loader::load_config;
use scopebox::error::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.global_opts.verbose);

    let config = load_config(cli.global_opts.config.as_deref())?;
    let format = cli.global_opts.format.clone();

    match cli.command {
        Commands::Run(args) => commands::run(args, config, format)?,
        Commands::Backends(args) => commands::backends(args, config, format)?,
        Commands::Whitelist(args) => commands::whitelist(args, config, format)?,
        Commands::Init(args) => commands::init(args)?,
        Commands::Config(args) => commands::config(args, config)?,
    }

    Ok(())
}

fn init_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
