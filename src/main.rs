mod prompt;
mod wizard;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use seedgate_core::logging::LoggingBuilder;
use seedgate_core::{
    default_data_dir, KeyPairGenerator, MemoryRegistrar, ProvisionConfig,
    ProvisioningOrchestrator, Registrar,
};
use tokio::io::BufReader;

use prompt::Prompt;
use wizard::{Outcome, Wizard};

/// seedgate - create an anonymous account step by step
#[derive(Parser, Debug)]
#[command(name = "seedgate-wizard")]
#[command(about = "Interactive anonymous account setup", version)]
struct Args {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory for configuration and logs
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Configuration file (default: <data-dir>/seedgate.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep accounts in memory instead of calling the service
    #[arg(long)]
    offline: bool,

    /// Registration endpoint, overriding the configuration
    #[arg(long)]
    url: Option<String>,

    /// Proof-of-work difficulty, overriding the configuration
    #[arg(long)]
    difficulty: Option<u32>,
}

async fn run_wizard<R: Registrar>(
    orch: ProvisioningOrchestrator<R>,
) -> Result<(Outcome, Option<String>)> {
    let input = BufReader::new(tokio::io::stdin());
    let mut wizard = Wizard::new(orch, Prompt::new(input, std::io::stdout()));
    let outcome = wizard.run().await?;
    let public_id = wizard.orchestrator().keypair().map(|k| k.public_id());
    wizard.into_output().flush()?;
    Ok((outcome, public_id))
}

async fn run(args: Args) -> Result<Outcome> {
    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    let config_path = args
        .config
        .unwrap_or_else(|| ProvisionConfig::path_in(&data_dir));
    let mut config = ProvisionConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(url) = args.url {
        config.registration_url = Some(url);
    }
    if let Some(difficulty) = args.difficulty {
        config.pow.difficulty = difficulty;
    }
    config.validate()?;

    let mut logging = LoggingBuilder::new(args.verbose);
    if config.log_to_file {
        logging = logging.with_jsonl(data_dir.join("logs"), "wizard");
    }
    if let Err(e) = logging.init() {
        eprintln!("Warning: logging not initialized: {e}");
    }

    let keygen = KeyPairGenerator::default();
    let encoder = config.encoder()?;
    let solver = config.solver()?;

    let (outcome, public_id) = if args.offline || config.registration_url.is_none() {
        tracing::info!("Registering against the in-memory registrar");
        let orch = ProvisioningOrchestrator::with_parts(
            keygen,
            encoder,
            solver,
            MemoryRegistrar::new(config.pow.difficulty),
        );
        run_wizard(orch).await?
    } else {
        let orch =
            ProvisioningOrchestrator::with_parts(keygen, encoder, solver, config.http_registrar()?);
        run_wizard(orch).await?
    };

    if let Some(public_id) = public_id {
        tracing::info!(%public_id, outcome = ?outcome, "Wizard finished");
    }
    Ok(outcome)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(Outcome::Registered(account)) => {
            println!("\nAccount {} is ready.", account.user_id);
            ExitCode::SUCCESS
        }
        Ok(Outcome::LocalOnly) => {
            println!("\nKeep your private secret and seed phrase safe.");
            ExitCode::from(2)
        }
        Ok(Outcome::Quit) => {
            println!("\nNothing was registered.");
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
