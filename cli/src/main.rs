//! `aegis`: enable account abstraction on an owner account, delegate to a
//! second key, and submit a transfer the delegate signs as the owner.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use aegis_cli::{delegate_address, ClientConfig, Scenario, Settings};
use aegis_ledger::{LedgerClient, RpcLedgerClient};
use aegis_nullables::NullLedger;
use aegis_signer::{KeySigner, LocalAccount, TransactionSigner};
use aegis_types::{Clock, KeyPair, NetworkId, SystemClock};
use aegis_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "aegis", about = "Delegated signing through account abstraction")]
struct Cli {
    /// Network: "mainnet", "testnet", "devnet", or "local" (in-process ledger).
    #[arg(long, env = "AEGIS_NETWORK")]
    network: Option<NetworkId>,

    /// JSON-RPC endpoint of a node on the chosen network.
    #[arg(long, env = "AEGIS_NODE_URL")]
    node_url: Option<String>,

    /// Address that published the delegated_signer module.
    #[arg(long, env = "DEPLOYER_ADDRESS")]
    deployer_address: Option<String>,

    /// How long the delegate may sign for the owner.
    #[arg(long, env = "DELEGATION_SECONDS")]
    delegation_seconds: Option<u64>,

    /// Hex-encoded owner private key. Generated when absent.
    #[arg(long, env = "OWNER_PRIVATE_KEY", hide_env_values = true)]
    owner_private_key: Option<String>,

    /// Hex-encoded delegate private key. Generated when absent.
    #[arg(long, env = "DELEGATE_PRIVATE_KEY", hide_env_values = true)]
    delegate_private_key: Option<String>,

    /// Seconds to wait for each transaction to commit.
    #[arg(long, env = "AEGIS_CONFIRMATION_TIMEOUT_SECS")]
    confirmation_timeout_secs: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "AEGIS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "AEGIS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Fund, enable, delegate, and send one delegated transfer.
    Run,
    /// Revoke the owner's delegation.
    Revoke,
}

impl Cli {
    fn merge_into(self, base: ClientConfig) -> (ClientConfig, Command) {
        let config = ClientConfig {
            network: self.network.unwrap_or(base.network),
            node_url: self.node_url.or(base.node_url),
            deployer_address: self.deployer_address.or(base.deployer_address),
            delegation_seconds: self.delegation_seconds.unwrap_or(base.delegation_seconds),
            owner_private_key: self.owner_private_key.or(base.owner_private_key),
            delegate_private_key: self.delegate_private_key.or(base.delegate_private_key),
            confirmation_timeout_secs: self
                .confirmation_timeout_secs
                .unwrap_or(base.confirmation_timeout_secs),
            log_level: self.log_level.unwrap_or(base.log_level),
            log_format: self.log_format.unwrap_or(base.log_format),
        };
        (config, self.command)
    }
}

fn load_key(keys: Option<KeyPair>, role: &str) -> KeyPair {
    keys.unwrap_or_else(|| {
        tracing::warn!("{role} private key not provided; generating a new account");
        aegis_crypto::generate_keypair()
    })
}

fn connect(settings: &Settings, clock: Arc<dyn Clock>) -> anyhow::Result<Arc<dyn LedgerClient>> {
    match (settings.network, settings.node_url.as_deref()) {
        (NetworkId::Local, _) => {
            tracing::info!("using the in-process ledger");
            Ok(Arc::new(NullLedger::new(NetworkId::Local, settings.publisher, clock)))
        }
        (network, Some(url)) => Ok(Arc::new(RpcLedgerClient::new(url, network)?)),
        (network, None) => anyhow::bail!("network {network} needs a node URL"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base = match cli.config {
        Some(ref path) => ClientConfig::from_toml_file(path)?,
        None => ClientConfig::default(),
    };
    let (config, command) = cli.merge_into(base);

    init_logging(config.log_format, &config.log_level)?;
    let mut settings = config.validate()?;

    let owner = Arc::new(LocalAccount::new(load_key(settings.owner_key.take(), "Owner")));
    let delegate = Arc::new(KeySigner::new(load_key(settings.delegate_key.take(), "Delegate")));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ledger = connect(&settings, clock.clone())?;
    let scenario = Scenario::new(
        ledger,
        settings.network,
        settings.publisher,
        clock,
        settings.confirmation_timeout,
    );

    println!("Network: {}", settings.network);
    println!("Owner: {}", owner.address());
    println!("Delegate: {}", delegate_address(delegate.as_ref()));
    println!("Authenticator: {}", scenario.routine());

    match command {
        Command::Run => {
            let report = scenario
                .run(owner, delegate, settings.delegation_seconds)
                .await
                .context("delegated transfer flow failed")?;
            println!("Delegation expires at: {}", report.grant.expires_at);
            println!("Transfer hash: {}", report.transfer_hash());
        }
        Command::Revoke => {
            let committed = scenario
                .revoke(owner.as_ref())
                .await
                .context("revoke failed")?;
            println!("Revoke hash: {}", committed.hash);
        }
    }

    Ok(())
}
