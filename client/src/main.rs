use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueHint};
use mescrow_client::util::{load_input_data, parse_arg};
use mescrow_client::{FileStore, LocalHost, LocalKey};
use mescrow_core::config::load_config;
use mescrow_core::{
    EscrowId, EscrowRecord, IdentityError, Invocation, KeyScheme, RecordStore, Transfer,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "./escrow_config.json";
const DEFAULT_STORE_PATH: &str = "./escrows.store";

fn main() -> anyhow::Result<()> {
    // In order to view logs, run with `RUST_LOG=info`
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { scheme, out } => {
            let key = LocalKey::generate(scheme)?;
            key.save(&out)?;
            println!("{}", key.address());
            tracing::info!(path = %out.display(), "Key generated");
        }
        Commands::Address { key } => {
            let key = LocalKey::load(&key)?;
            println!("{}", key.address());
        }
        Commands::Invoke {
            config,
            store,
            height,
            transfer,
            keys,
            operation,
            args,
        } => {
            let config = load_config(&config)?;
            let store = FileStore::open(&store)?;
            let signers = keys
                .iter()
                .map(LocalKey::load)
                .collect::<anyhow::Result<Vec<_>>>()?;
            let args = args
                .iter()
                .map(|arg| parse_arg(arg))
                .collect::<Result<Vec<_>, _>>()?;

            let mut invocation = Invocation::new(operation, args);
            if let Some(path) = transfer {
                let transfer: Transfer = load_input_data(&path)?;
                invocation = invocation.with_transfer(transfer);
            }

            let mut host = LocalHost::new(config, store)?;
            let receipt = host.execute(&invocation, &signers, height)?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Commands::Show { store, id } => {
            let id: EscrowId = id.parse().context("parsing escrow id")?;
            let store = FileStore::open(&store)?;
            let record = store
                .get(id.as_bytes())
                .map(|bytes| EscrowRecord::decode(&bytes))
                .transpose()?
                .with_context(|| format!("no escrow {id} in {:?}", store.path()))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "mescrow-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a key file and print its address.
    Keygen {
        #[arg(short, long, default_value = "ed25519", value_parser = parse_scheme)]
        scheme: KeyScheme,

        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
    },
    /// Print the address controlled by a key file.
    Address {
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        key: PathBuf,
    },
    /// Sign and run one escrow operation.
    Invoke {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_CONFIG_PATH,
            value_hint = ValueHint::FilePath)]
        config: PathBuf,

        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_STORE_PATH,
            value_hint = ValueHint::FilePath)]
        store: PathBuf,

        /// Current block height.
        #[arg(long)]
        height: u64,

        /// JSON file describing the triggering transfer.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        transfer: Option<PathBuf>,

        /// Key files signing the invocation (repeatable).
        #[arg(short = 'k', long = "key", value_hint = ValueHint::FilePath)]
        keys: Vec<PathBuf>,

        /// registerEscrow, acceptEscrow, releaseEscrow, refund or moderate.
        operation: String,

        /// Hex or base58 encoded arguments.
        args: Vec<String>,
    },
    /// Print a stored escrow record.
    Show {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_STORE_PATH,
            value_hint = ValueHint::FilePath)]
        store: PathBuf,

        #[arg(long)]
        id: String,
    },
}

fn parse_scheme(s: &str) -> Result<KeyScheme, String> {
    s.parse().map_err(|e: IdentityError| e.to_string())
}
