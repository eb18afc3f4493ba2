//! `iris-e01-dispatch`: replay hook firings against a copy of the host data.
//!
//! ## Commands
//!
//! - `iris-e01-dispatch describe`: print the module metadata as JSON
//! - `iris-e01-dispatch fire --db <SQLITE> --payload <JSON|->`: run the hook
//!   handler once and print the resulting status as JSON

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use iris_e01_processor::E01Processor;
use iris_e01_processor::EVIDENCE_CREATE_HOOK;
use iris_e01_processor::HookName;
use iris_e01_processor::HookPayload;
use iris_e01_processor::HostSettings;
use iris_e01_processor::ModuleInterface;
use iris_e01_processor::SqliteStore;
use iris_e01_processor::config::ConfigSource;
use iris_e01_processor::config::StaticConfig;
use iris_e01_processor::config::TomlFileConfig;
use iris_e01_processor::metadata::module_info;

#[derive(Debug, Parser)]
#[command(version, about = "Replay evidence hooks through the E01 processor module")]
struct Cli {
    /// Enable debug logging on stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print module metadata and configuration parameters.
    Describe,
    /// Run the hook handler once.
    Fire(FireArgs),
}

#[derive(Debug, Parser)]
struct FireArgs {
    /// SQLite database holding `data_store_file`, `cases` and `client`.
    #[arg(long)]
    db: PathBuf,

    /// TOML file with module parameters (defaults when omitted).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host upload root used for output directories.
    #[arg(long = "uploads-root")]
    uploads_root: Option<PathBuf>,

    /// Hook name to dispatch.
    #[arg(long, default_value = EVIDENCE_CREATE_HOOK)]
    hook: String,

    /// JSON payload file, or `-` for stdin.
    #[arg(long)]
    payload: String,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn read_payload(source: &str) -> anyhow::Result<HookPayload> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading payload from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading payload {source}"))?
    };
    serde_json::from_str(&text).context("parsing hook payload")
}

fn fire(args: FireArgs) -> anyhow::Result<bool> {
    let store = SqliteStore::open(&args.db)
        .with_context(|| format!("opening {}", args.db.display()))?;
    let config: Arc<dyn ConfigSource> = match args.config {
        Some(path) => Arc::new(TomlFileConfig::new(path)),
        None => Arc::new(StaticConfig::default()),
    };
    let host = HostSettings {
        uploaded_path: args.uploads_root,
    };
    let processor = E01Processor::new(config, Arc::new(store), host);

    let payload = read_payload(&args.payload)?;
    let hook: HookName = args.hook.parse()?;
    tracing::info!("dispatching {hook} with {} evidence item(s)", payload.evidences().len());

    let status = processor.hooks_handler(&hook, None, payload);
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(status.is_success())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Describe => {
            println!("{}", serde_json::to_string_pretty(&module_info())?);
        }
        Command::Fire(args) => {
            if !fire(args)? {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
