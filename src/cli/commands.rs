use tracing::info;

use crate::cli::args::{
    BackendsArgs, ConfigAction, ConfigArgs, InitArgs, OutputFormat, RunArgs, WhitelistArgs,
};
use crate::config::loader::get_config_path;
use crate::config::types::ScopeboxConfig;
use crate::error::{Result, ScopeboxError};
use crate::namespace::GlobalNamespace;
use crate::sandbox::{available_sandboxes, EscapeWhitelist, SandboxEnv};
use crate::scenario::{load_scenario, run_scenario, ScenarioReport};

// ============================================================================
// Sandbox Commands
// ============================================================================

/// Replay a scenario file
pub fn run(args: RunArgs, config: ScopeboxConfig, format: OutputFormat) -> Result<()> {
    info!(scenario = %args.scenario.display(), "Running scenario");

    let mut sandbox_config = config.sandbox;
    if let Some(kind) = args.kind {
        sandbox_config.default_kind = kind;
    }
    sandbox_config.development |= args.development;
    if args.no_interception {
        sandbox_config.interception_available = false;
    }

    let scenario = load_scenario(&args.scenario)?;
    let report = run_scenario(&scenario, &sandbox_config)?;

    match format {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

/// List sandbox kinds
pub fn backends(args: BackendsArgs, config: ScopeboxConfig, format: OutputFormat) -> Result<()> {
    let mut sandbox_config = config.sandbox;
    if args.no_interception {
        sandbox_config.interception_available = false;
    }
    let env = SandboxEnv::from_config(GlobalNamespace::new(), &sandbox_config);
    let kinds = available_sandboxes(&env);

    match format {
        OutputFormat::Text => {
            println!("{:<10} {:<10} DESCRIPTION", "KIND", "STATUS");
            println!("{}", "-".repeat(70));
            for kind in &kinds {
                let status = if kind.available {
                    "available"
                } else {
                    "missing"
                };
                println!("{:<10} {:<10} {}", kind.name, status, kind.description);
                if let Some(reason) = kind.unavailable_reason {
                    println!("{:<21} ({})", "", reason);
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&kinds)?),
    }

    Ok(())
}

/// Show the escape whitelist
pub fn whitelist(args: WhitelistArgs, config: ScopeboxConfig, format: OutputFormat) -> Result<()> {
    let development = args.development || config.sandbox.development;
    let whitelist =
        EscapeWhitelist::for_environment(development, config.sandbox.extra_escape_keys.as_slice());
    let keys: Vec<String> = whitelist.iter().map(ToString::to_string).collect();

    match format {
        OutputFormat::Text => {
            for key in &keys {
                println!("{}", key);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::json!({ "keys": keys })),
    }

    Ok(())
}

// ============================================================================
// Config Commands
// ============================================================================

pub fn init(args: InitArgs) -> Result<()> {
    let config_path = get_config_path();

    if config_path.exists() && !args.force {
        println!("Configuration already exists at: {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let default_config = ScopeboxConfig::default();
    let toml_str = toml::to_string_pretty(&default_config)
        .map_err(|e| ScopeboxError::Config(e.to_string()))?;

    std::fs::write(&config_path, toml_str)?;

    println!("Created configuration at: {}", config_path.display());
    println!("\nQuick start:");
    println!("  # Replay a scenario with proxy sandboxes");
    println!("  scopebox run scenario.toml --kind proxy");
    println!();
    println!("  # See which sandbox kinds this host supports");
    println!("  scopebox backends");

    Ok(())
}

pub fn config(args: ConfigArgs, config: ScopeboxConfig) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&config)
                .map_err(|e| ScopeboxError::Config(e.to_string()))?;
            println!("{}", toml_str);
        }
        ConfigAction::Path => {
            println!("{}", get_config_path().display());
        }
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn print_report(report: &ScenarioReport) {
    println!("{:<6} {:<12} {:<28} RESULT", "STEP", "OP", "TARGET");
    println!("{}", "-".repeat(70));
    for outcome in &report.steps {
        println!(
            "{:<6} {:<12} {:<28} {}",
            outcome.step, outcome.op, outcome.target, outcome.result
        );
    }

    println!();
    println!("{:<16} {:<10} {:<8} MODIFIED", "SANDBOX", "KIND", "RUNNING");
    for info in &report.sandboxes {
        println!(
            "{:<16} {:<10} {:<8} {}",
            info.name,
            info.kind,
            info.running,
            info.modified_keys.join(", ")
        );
    }
    println!("Active proxy sandboxes: {}", report.active_sandboxes);

    println!();
    println!("Global namespace:");
    for (key, value) in &report.globals {
        println!("  {} = {}", key, value);
    }
}
