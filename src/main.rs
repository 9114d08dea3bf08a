//! memload - load-generation harness for memcached-compatible servers

use anyhow::Result;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use memload::config::{CliArgs, HarnessConfig};

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn print_banner(config: &HarnessConfig) {
    if config.quiet {
        return;
    }

    println!("memload v{}", env!("CARGO_PKG_VERSION"));
    println!("====================================");
    println!("Target: {}", config.address);
    println!("Concurrency: {}", config.concurrency);
    match (config.max_requests, config.max_seconds) {
        (Some(n), Some(s)) => println!("Bound: {} requests or {} seconds", n, s),
        (Some(n), None) => println!("Bound: {} requests", n),
        (None, Some(s)) => println!("Bound: {} seconds", s),
        (None, None) => {}
    }
    println!("Key: {}", config.key);
    println!("Driver: {:?}", config.driver);
    println!("====================================\n");
}

async fn run() -> Result<()> {
    let args = CliArgs::parse_args();

    setup_logging(args.verbose, args.quiet);

    let config = HarnessConfig::from_cli(&args)?;

    print_banner(&config);

    let report = memload::run(config).await?;
    report.render();

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
