//! Asset ledger command-line host

use anyhow::Context as _;
use asset_ledger::{Config, Contract, Intent, Ledger};
use clap::{Parser, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "asset-ledger", version, about = "Run asset ledger operations")]
struct Args {
    /// Configuration file (TOML); environment variables are used if absent
    #[arg(long, global = true, env = "LEDGER_CONFIG", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Caller identity token
    #[arg(long, global = true, env = "LEDGER_CALLER", default_value = "")]
    caller: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LEDGER_LOG_JSON")]
    log_json: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Cmd,
}

#[derive(clap::Subcommand)]
enum Cmd {
    /// Run an operation and commit its writes
    Submit {
        /// Operation name, e.g. `CreateAsset`
        operation: String,

        /// Positional operation arguments
        args: Vec<String>,
    },

    /// Run an operation without committing anything
    Evaluate {
        /// Operation name, e.g. `ReadAsset`
        operation: String,

        /// Positional operation arguments
        args: Vec<String>,
    },

    /// List registered operations
    Operations,

    /// Print contract metadata
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };

    if let Cmd::Info = args.command {
        println!("{}", serde_json::to_string_pretty(&Contract::info())?);
        return Ok(());
    }

    let ledger = Ledger::open(config).await.context("opening ledger")?;

    let result = match args.command {
        Cmd::Submit { operation, args: op_args } => {
            ledger.submit(&args.caller, &operation, op_args).await
        }
        Cmd::Evaluate { operation, args: op_args } => {
            ledger.evaluate(&args.caller, &operation, op_args).await
        }
        Cmd::Operations => {
            for op in ledger.operations().operations() {
                let intent = match op.intent {
                    Intent::Submit => "submit",
                    Intent::Evaluate => "evaluate",
                };
                println!("{:<14} {:<9} {}", op.name, intent, op.params.join(" "));
            }
            Ok(String::new())
        }
        Cmd::Info => Ok(String::new()),
    };

    ledger.shutdown().await?;

    match result {
        Ok(response) if response.is_empty() => Ok(()),
        Ok(response) => {
            println!("{}", response);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{} ({})", e, e.code())),
    }
}
