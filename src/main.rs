// qrsign - pair a mobile wallet by QR code and sign remotely
//
// The binary manages the stored client identity and offers a few offline
// helpers. Relay transports are supplied by programs embedding the library.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use url::Url;

use qrsign::config::{default_rpc_url, supported_chain};
use qrsign::{AccountId, AppMetadata, AuditLog, ClientOptions, TerminalQr, SUPPORTED_CHAINS};

#[derive(Parser)]
#[command(name = "qrsign")]
#[command(about = "Pair a wallet by QR code and forward signing requests to it")]
#[command(version)]
struct Cli {
    /// Path to the client config file
    #[arg(short, long, default_value = "~/.qrsign/config.json")]
    config: String,

    /// Only log warnings and errors
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a client config from flags and environment
    Init {
        /// Relay project id
        #[arg(long, env = "WALLETCONNECT_PROJECT_ID", hide_env_values = true)]
        project_id: String,
        /// Default chain id for requests
        #[arg(long, default_value_t = qrsign::config::DEFAULT_CHAIN_ID)]
        chain_id: u64,
        /// Custom RPC endpoint for the default chain
        #[arg(long)]
        rpc_url: Option<Url>,
        /// Relay endpoint override (ws:// or wss://)
        #[arg(long)]
        relay_url: Option<Url>,
        /// App name shown in the wallet
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// Icon URL (repeatable)
        #[arg(long = "icon")]
        icons: Vec<String>,
        /// Overwrite an existing config
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Show the stored config
    Config,
    /// Render a pairing URI as a QR code
    Qr {
        uri: String,
    },
    /// List supported chains and their default RPC endpoints
    Chains,
    /// Split a CAIP-10 account id into its parts
    ParseAccount {
        account: String,
    },
    /// Show config and audit log status
    Status,
}

fn expand_home(path: &str) -> PathBuf {
    PathBuf::from(path.replace('~', &std::env::var("HOME").unwrap_or_default()))
}

#[allow(clippy::too_many_arguments)]
fn init(
    config_path: &Path,
    project_id: String,
    chain_id: u64,
    rpc_url: Option<Url>,
    relay_url: Option<Url>,
    name: Option<String>,
    description: Option<String>,
    url: Option<String>,
    icons: Vec<String>,
    force: bool,
) -> Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let defaults = AppMetadata::default();
    let metadata = AppMetadata {
        name: name.unwrap_or(defaults.name),
        description: description.unwrap_or(defaults.description),
        url: url.unwrap_or(defaults.url),
        icons,
    };

    let mut options = ClientOptions::new(project_id)
        .with_chain_id(chain_id)
        .with_metadata(metadata);
    options.rpc_url = rpc_url;
    options.relay_url = relay_url;
    options
        .validate()
        .context("Refusing to save an invalid config")?;

    if supported_chain(chain_id).is_none() {
        tracing::warn!(chain_id, "chain is not in the supported list; the wallet may refuse it");
    }

    options.save(config_path)?;
    AuditLog::new(config_path).record("config_written", &format!("chain: {chain_id}"));

    println!("✓ Config saved to {}", config_path.display());
    println!("  App:   {}", options.metadata.name);
    println!("  Chain: eip155:{}", options.chain_id);
    println!("  RPC:   {}", options.rpc_url_for(options.chain_id));
    Ok(())
}

fn load_config(config_path: &Path) -> Result<ClientOptions> {
    ClientOptions::load(config_path)?.with_context(|| {
        format!(
            "No config at {}. Run `qrsign init` first.",
            config_path.display()
        )
    })
}

fn show_config(config_path: &Path) -> Result<()> {
    let options = load_config(config_path)?;
    println!("{}", serde_json::to_string_pretty(&options)?);
    Ok(())
}

fn show_qr(uri: &str) -> Result<()> {
    if !uri.starts_with("wc:") {
        tracing::warn!("URI does not look like a pairing URI");
    }
    let code = TerminalQr::to_unicode(uri).context("Failed to encode QR code")?;
    println!("{code}");
    println!("{uri}");
    Ok(())
}

fn list_chains() {
    println!("=== Supported Chains ===\n");
    for chain in SUPPORTED_CHAINS {
        println!("  eip155:{:<6} {:<16} {}", chain.id, chain.name, default_rpc_url(chain.id));
    }
}

fn parse_account(raw: &str) -> Result<()> {
    let account = AccountId::parse(raw)?;
    println!("namespace: {}", account.namespace);
    println!("reference: {}", account.reference);
    println!("address:   {}", account.address);
    if let Some(chain) = account
        .reference
        .parse::<u64>()
        .ok()
        .and_then(supported_chain)
    {
        println!("chain:     {}", chain.name);
    }
    Ok(())
}

fn show_status(config_path: &Path) -> Result<()> {
    println!("=== qrsign Status ===\n");

    match ClientOptions::load(config_path)? {
        Some(options) => {
            println!("Config: {}", config_path.display());
            println!("  App:     {}", options.metadata.name);
            println!("  Chain:   eip155:{}", options.chain_id);
            println!("  RPC:     {}", options.rpc_url_for(options.chain_id));
            match &options.relay_url {
                Some(relay) => println!("  Relay:   {relay}"),
                None => println!("  Relay:   transport default"),
            }
            if let Err(e) = options.validate() {
                println!("  ⚠️  {e}");
            }
        }
        None => {
            println!("Config: ❌ not found (run `qrsign init`)");
        }
    }

    let audit_path = AuditLog::path_for(config_path);
    if let Ok(metadata) = std::fs::metadata(&audit_path) {
        println!("\nAudit log: {} ({} bytes)", audit_path.display(), metadata.len());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    use tracing_subscriber::EnvFilter;
    let default_filter = if cli.quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = expand_home(&cli.config);

    match cli.command {
        Commands::Init {
            project_id,
            chain_id,
            rpc_url,
            relay_url,
            name,
            description,
            url,
            icons,
            force,
        } => init(
            &config_path,
            project_id,
            chain_id,
            rpc_url,
            relay_url,
            name,
            description,
            url,
            icons,
            force,
        )?,
        Commands::Config => show_config(&config_path)?,
        Commands::Qr { uri } => show_qr(&uri)?,
        Commands::Chains => list_chains(),
        Commands::ParseAccount { account } => parse_account(&account)?,
        Commands::Status => show_status(&config_path)?,
    }

    Ok(())
}
