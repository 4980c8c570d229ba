//! Content Shield CLI
//!
//! Inspect configuration and run protection scenarios against a simulated
//! page.

use clap::{Parser, Subcommand};
use content_shield::sim::scenario::BUILTIN_SCENARIOS;
use content_shield::{Identity, ProtectionConfig, Scenario, ScenarioReport, PROTECTION_NOTICE, VERSION};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "content-shield")]
#[command(version = VERSION)]
#[command(about = "Best-effort content protection: detection, blur and watermarks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the user-facing protection notice
    Notice,

    /// Show configuration
    Config {
        /// Print only the config file location
        #[arg(long)]
        path: bool,
    },

    /// Run a built-in scenario
    Simulate {
        /// Scenario name (printscreen, tab-switch, alt-tab, devtools, fullscreen, snipping)
        name: String,

        /// Log this identity in first and render the watermark
        #[arg(long)]
        email: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a scenario from a JSON file
    Replay {
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("content_shield=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Notice => {
            cmd_notice();
        }
        Commands::Config { path } => {
            cmd_config(path);
        }
        Commands::Simulate { name, email, json } => {
            cmd_simulate(&name, email, json);
        }
        Commands::Replay { file, json } => {
            cmd_replay(&file, json);
        }
    }
}

fn cmd_notice() {
    println!("{PROTECTION_NOTICE}");
}

fn cmd_config(path_only: bool) {
    let path = ProtectionConfig::config_path();
    if path_only {
        println!("{}", path.display());
        return;
    }

    let config = match ProtectionConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load {path:?}: {e}");
            eprintln!("Showing defaults.");
            ProtectionConfig::default()
        }
    };

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_simulate(name: &str, email: Option<String>, json: bool) {
    let mut scenario = match Scenario::builtin(name) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    if let Some(email) = email {
        scenario = scenario.with_identity(Identity::new(email));
    }

    if !json {
        println!("Content Shield v{VERSION}");
        println!("Scenario: {} - {}", scenario.name, scenario.description);
        println!();
    }
    report(scenario.run(), json);
}

fn cmd_replay(file: &Path, json: bool) {
    let scenario = match Scenario::load(file) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Error: Could not load {file:?}: {e}");
            eprintln!("Built-in scenarios: {}", BUILTIN_SCENARIOS.join(", "));
            std::process::exit(2);
        }
    };
    report(scenario.run(), json);
}

fn report(report: ScenarioReport, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "Error".to_string())
        );
    } else {
        println!("{report}");
    }

    if !report.passed {
        std::process::exit(1);
    }
}
