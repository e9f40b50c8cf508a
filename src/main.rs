use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use keychest::{BlobStore, Config, FileStorage, Keychain};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "keychest")]
#[command(
    version,
    about = "Password-protected credential keychain with tamper-evident dumps."
)]
struct Cli {
    /// Directory holding keychain snapshots
    #[arg(long, global = true, value_name = "DIR", env = "KEYCHEST_STORE")]
    store: Option<PathBuf>,

    /// Whose keychain to use
    #[arg(long, global = true, value_name = "ID", env = "KEYCHEST_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Creates an empty keychain
    Init,

    /// Stores a secret for a domain, replacing any previous one
    #[command(arg_required_else_help = true)]
    Set { name: String, value: String },

    /// Prints the secret stored for a domain
    #[command(arg_required_else_help = true)]
    Get { name: String },

    /// Removes the secret stored for a domain
    #[command(arg_required_else_help = true)]
    Remove { name: String },

    /// Lists stored domain names
    List,

    /// Checks the checksum and every record of the keychain
    Verify,

    /// Prints the blob and its checksum, one per line
    Export,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keychest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn open(config: &Config, storage: &FileStorage) -> Result<Keychain> {
    if !storage.exists(config.user())? {
        bail!("no keychain for user '{}'", config.user());
    }
    let password = auth::read_password()?;
    Keychain::load_from(storage, config.user(), password)?
        .with_context(|| format!("no keychain for user '{}'", config.user()))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Cli::parse();
    let config = Config::resolve(args.store, args.user)?;
    let mut storage = config.storage();

    match args.command {
        Commands::Init => {
            if storage.exists(config.user())? {
                bail!("keychain for user '{}' already exists", config.user());
            }
            let password = auth::read_new_password()?;
            let keychain = Keychain::init(password)?;
            keychain.save_to(&mut storage, config.user())?;
            println!("keychain initialized");
        }
        Commands::Set { name, value } => {
            let mut keychain = open(&config, &storage)?;
            keychain.set(&name, &value)?;
            keychain.save_to(&mut storage, config.user())?;
            println!("stored secret '{name}'");
        }
        Commands::Get { name } => {
            let keychain = open(&config, &storage)?;
            match keychain.get(&name)? {
                Some(secret) => println!("{secret}"),
                None => println!("secret not found"),
            }
        }
        Commands::Remove { name } => {
            let mut keychain = open(&config, &storage)?;
            if keychain.remove(&name) {
                keychain.save_to(&mut storage, config.user())?;
                println!("secret '{name}' removed");
            } else {
                println!("secret '{name}' not found");
            }
        }
        Commands::List => {
            let keychain = open(&config, &storage)?;
            let domains = keychain.domains()?;
            if domains.is_empty() {
                println!("No secrets stored.");
            }
            for domain in domains {
                println!("{domain}");
            }
        }
        Commands::Verify => {
            let keychain = open(&config, &storage)?;
            let count = keychain.verify()?;
            println!("keychain ok: {count} record(s)");
        }
        Commands::Export => {
            let keychain = open(&config, &storage)?;
            let snapshot = keychain.dump()?;
            println!("{}", snapshot.blob);
            println!("{}", snapshot.checksum);
        }
    }

    Ok(())
}
