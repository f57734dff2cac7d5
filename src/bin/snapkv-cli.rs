use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use snapkv::config::DEFAULT_ADDR;
use snapkv::KvClient;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Action {
    Get,
    Set,
}

/// Command-line client for a snapkv server
#[derive(Debug, Parser)]
#[command(name = "snapkv-cli", version)]
struct Args {
    /// Action to perform
    #[arg(long, value_enum, default_value_t = Action::Get)]
    action: Action,

    /// Key to set or get
    #[arg(long, default_value = "")]
    key: String,

    /// Value to set (only for set action)
    #[arg(long, default_value = "")]
    value: String,

    /// Server address
    #[arg(long, env = "SNAPKV_ADDR", default_value = DEFAULT_ADDR)]
    addr: String,

    /// Deadline of the whole call, in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Keep stdout for results, diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    match args.action {
        Action::Set if args.key.is_empty() || args.value.is_empty() => {
            bail!("Key and value must be provided for set action")
        }
        Action::Get if args.key.is_empty() => bail!("Key must be provided for get action"),
        _ => {}
    }

    let mut client = KvClient::connect(&args.addr, Duration::from_millis(args.timeout_ms))
        .await
        .with_context(|| format!("Failed to connect to server at {}", args.addr))?;

    match args.action {
        Action::Set => {
            let resp = client
                .set(&args.key, &args.value)
                .await
                .context("Failed to set key-value")?;
            println!("Set Response: {}", resp.success);
        }
        Action::Get => {
            let resp = client.get(&args.key).await.context("Failed to get value")?;
            if resp.found {
                println!("Get Response: Key = {}, Value = {}", args.key, resp.value);
            } else {
                println!("Key not found");
            }
        }
    }

    Ok(())
}
