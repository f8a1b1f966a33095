//! seedgate CLI
//!
//! Thin wrapper around seedgate-core for scripted use.
//!
//! ## Usage
//!
//! ```bash
//! # Generate a keypair
//! seedgate keygen
//!
//! # Generate a seed phrase
//! seedgate mnemonic
//!
//! # Solve and check a proof-of-work
//! seedgate pow solve --public-id pk_... --difficulty 3
//! seedgate pow verify --seed pk_...1700000000000 --nonce 6465 --hash 000... --difficulty 3
//!
//! # Run the whole flow against the in-memory registrar
//! seedgate provision --offline
//!
//! # Inspect or create the config file
//! seedgate config show
//! seedgate config init --registration-url https://example.com/api/register
//! ```

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

use seedgate_core::logging::LoggingBuilder;
use seedgate_core::pow::{hash_attempt, meets_difficulty};
use seedgate_core::{
    default_data_dir, AgentTone, Challenge, KeyPairGenerator, MemoryRegistrar, MnemonicEncoder,
    PowSolver, PowStatus, ProfileConfig, ProfileVisibility, ProvisionConfig, ProvisionError,
    ProvisioningOrchestrator, Registrar, Wordlist,
};

/// seedgate - anonymous account provisioning
#[derive(Parser)]
#[command(name = "seedgate")]
#[command(version)]
#[command(about = "seedgate - anonymous account provisioning")]
#[command(
    long_about = "Generates an account keypair and seed phrase locally, solves the sign-up proof-of-work, and registers a signed account draft."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Data directory (default: platform data dir + /seedgate)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/seedgate.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a keypair and print its identifiers
    Keygen {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Generate a 12-word seed phrase
    Mnemonic {
        /// Word list file (default: configured or embedded list)
        #[arg(short, long)]
        wordlist: Option<PathBuf>,
    },

    /// Proof-of-work tools
    Pow {
        #[command(subcommand)]
        action: PowAction,
    },

    /// Run the whole provisioning flow non-interactively
    Provision {
        /// Register with the in-memory registrar instead of the network
        #[arg(long)]
        offline: bool,

        /// Registration endpoint (overrides the config file)
        #[arg(long)]
        url: Option<String>,

        /// Profile visibility: public, anonymous, private
        #[arg(long, default_value = "anonymous")]
        visibility: String,

        /// Agent tone: neutral, friendly, formal, concise, playful
        #[arg(long, default_value = "neutral")]
        tone: String,

        /// Agent verbosity, 1 to 5
        #[arg(long, default_value_t = 3)]
        agent_verbosity: u8,

        /// Leading zero hex digits (overrides the config file)
        #[arg(long)]
        difficulty: Option<u32>,

        /// Submission retries after a network failure
        #[arg(long, default_value_t = 2)]
        retries: u32,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum PowAction {
    /// Search for a nonce
    Solve {
        /// Public id the challenge is bound to
        #[arg(long)]
        public_id: String,

        /// Challenge creation time in Unix ms (default: now)
        #[arg(long)]
        timestamp: Option<i64>,

        #[arg(long)]
        difficulty: Option<u32>,

        #[arg(long)]
        max_iterations: Option<u64>,

        #[arg(long)]
        chunk_size: Option<u64>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Check a nonce against a challenge seed
    Verify {
        /// Challenge seed: public id followed by the creation time in ms
        #[arg(long)]
        seed: String,

        #[arg(long)]
        nonce: u64,

        #[arg(long)]
        hash: String,

        #[arg(long)]
        difficulty: u32,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a config file
    Init {
        /// Registration endpoint to store
        #[arg(long)]
        registration_url: Option<String>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn setup_logging(verbosity: u8, data_dir: &Path, config: &ProvisionConfig) {
    let mut builder = LoggingBuilder::new(verbosity);
    if config.log_to_file {
        builder = builder.with_jsonl(data_dir.join("logs"), "cli");
    }
    if let Err(e) = builder.init() {
        eprintln!("Warning: logging not initialized: {e}");
    }
}

fn parse_profile(visibility: &str, tone: &str, verbosity: u8) -> Result<ProfileConfig> {
    let profile = ProfileConfig::new(
        visibility.parse::<ProfileVisibility>()?,
        tone.parse::<AgentTone>()?,
        verbosity,
    );
    profile.validate()?;
    Ok(profile)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let config_path = cli
        .config
        .unwrap_or_else(|| ProvisionConfig::path_in(&data_dir));
    let config = ProvisionConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    setup_logging(cli.verbose, &data_dir, &config);

    match cli.command {
        Commands::Keygen { json } => {
            let keypair = KeyPairGenerator::default().generate()?;
            if json {
                println!(
                    "{}",
                    json!({
                        "publicId": keypair.public_id(),
                        "privateSecret": keypair.private_secret(),
                        "publicKeyDer": keypair.public_key_hex(),
                        "signingKey": keypair.signing_key_hex(),
                    })
                );
            } else {
                println!("Public id:      {}", keypair.public_id());
                println!("Private secret: {}", keypair.private_secret());
                println!();
                println!("Keep the private secret offline. It is shown only once.");
            }
        }

        Commands::Mnemonic { wordlist } => {
            let list = match wordlist {
                Some(path) => Arc::new(Wordlist::from_file(path)?),
                None => config.wordlist()?,
            };
            let phrase = MnemonicEncoder::new(list).generate()?;
            println!("{phrase}");
        }

        Commands::Pow { action } => match action {
            PowAction::Solve {
                public_id,
                timestamp,
                difficulty,
                max_iterations,
                chunk_size,
                json,
            } => {
                let mut params = config.pow;
                if let Some(d) = difficulty {
                    params.difficulty = d;
                }
                if let Some(m) = max_iterations {
                    params.max_iterations = m;
                }
                if let Some(c) = chunk_size {
                    params.chunk_size = c;
                }
                let solver = PowSolver::new(params)?;
                let challenge = match timestamp {
                    Some(ms) => Challenge::at(public_id, ms),
                    None => Challenge::new(public_id),
                };

                let task = solver.spawn(challenge);
                let progress = spawn_progress_printer(task.subscribe());
                let result = task.join().await;
                progress.abort();
                let result = result?;

                if json {
                    println!("{}", serde_json::to_string(&result)?);
                } else {
                    println!("Nonce:      {}", result.nonce);
                    println!("Hash:       {}", result.hash);
                    println!("Timestamp:  {}", result.timestamp);
                    println!("Difficulty: {}", result.difficulty);
                }
            }

            PowAction::Verify {
                seed,
                nonce,
                hash,
                difficulty,
            } => {
                let recomputed = hash_attempt(&seed, nonce);
                if recomputed != hash.to_ascii_lowercase() {
                    anyhow::bail!("Invalid: hash does not match (expected {recomputed})");
                }
                if !meets_difficulty(&recomputed, difficulty) {
                    anyhow::bail!("Invalid: hash has fewer than {difficulty} leading zeros");
                }
                println!("Valid");
            }
        },

        Commands::Provision {
            offline,
            url,
            visibility,
            tone,
            agent_verbosity,
            difficulty,
            retries,
            json,
        } => {
            let profile = parse_profile(&visibility, &tone, agent_verbosity)?;
            let mut config = config;
            if let Some(d) = difficulty {
                config.pow.difficulty = d;
            }
            if url.is_some() {
                config.registration_url = url;
            }
            config.validate()?;

            let options = ProvisionOptions {
                profile,
                retries,
                json,
            };
            if offline {
                let registrar = MemoryRegistrar::new(config.pow.difficulty);
                run_provision(&config, registrar, options).await?;
            } else {
                let registrar = config.http_registrar().context(
                    "no registration endpoint; pass --url, set registration_url, or use --offline",
                )?;
                run_provision(&config, registrar, options).await?;
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("# {}", config_path.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Init {
                registration_url,
                force,
            } => {
                if config_path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to replace it)",
                        config_path.display()
                    );
                }
                let config = ProvisionConfig {
                    registration_url,
                    ..ProvisionConfig::default()
                };
                config.save(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
        },
    }

    Ok(())
}

struct ProvisionOptions {
    profile: ProfileConfig,
    retries: u32,
    json: bool,
}

async fn run_provision<R: Registrar>(
    config: &ProvisionConfig,
    registrar: R,
    options: ProvisionOptions,
) -> Result<()> {
    let mut orch = ProvisioningOrchestrator::with_parts(
        KeyPairGenerator::default(),
        config.encoder()?,
        config.solver()?,
        registrar,
    );

    let keypair = orch.generate_identity()?;
    let phrase = orch
        .seed_phrase()
        .map(ToString::to_string)
        .context("seed phrase missing after generation")?;
    // non-interactive: the printed output is the backup
    orch.confirm_backup(None)?;

    let task = orch.start_pow()?;
    let progress = spawn_progress_printer(task.subscribe());
    let outcome = task.join().await;
    progress.abort();
    let pow = orch.finish_pow(outcome)?;

    orch.choose_profile(options.profile)?;

    let mut attempt = 0;
    let submitted = loop {
        match orch.submit().await {
            Ok(account) => break Ok(account),
            Err(e @ ProvisionError::Network(_)) if attempt < options.retries => {
                attempt += 1;
                warn!(attempt, error = %e, "Retrying registration");
                tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
            }
            Err(e) => break Err(e),
        }
    };

    let account = match submitted {
        Ok(account) => Some(account),
        Err(e) => {
            eprintln!("Registration failed: {e}");
            orch.abandon_registration()?;
            None
        }
    };

    if options.json {
        println!(
            "{}",
            json!({
                "publicId": keypair.public_id(),
                "privateSecret": keypair.private_secret(),
                "seedPhrase": phrase,
                "proofOfWork": pow,
                "account": account,
                "localOnly": orch.local_only_notice().is_some(),
            })
        );
    } else {
        println!("Public id:      {}", keypair.public_id());
        println!("Private secret: {}", keypair.private_secret());
        println!("Seed phrase:    {phrase}");
        println!("Proof-of-work:  nonce {} ({})", pow.nonce, pow.hash);
        match &account {
            Some(account) => {
                println!();
                println!("Registered");
                println!("  User id:      {}", account.user_id);
                println!("  Status:       {}", account.account_status);
                println!("  Ledger block: {}", account.ledger_block_id);
            }
            None => {
                if let Some(notice) = orch.local_only_notice() {
                    println!();
                    println!("{notice}");
                }
            }
        }
    }

    match account {
        Some(account) => {
            info!(user_id = %account.user_id, "Provisioning finished");
            Ok(())
        }
        None => anyhow::bail!("account was not registered"),
    }
}

/// Print solver progress to stderr when it is a terminal
fn spawn_progress_printer(
    mut status: tokio::sync::watch::Receiver<PowStatus>,
) -> tokio::task::JoinHandle<()> {
    let interactive = std::io::stderr().is_terminal();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            if interactive {
                eprint!("\rSolving proof-of-work... {:>3.0}%", current.progress() * 100.0);
            }
            if current.is_finished() {
                if interactive {
                    eprintln!();
                }
                break;
            }
        }
    })
}
