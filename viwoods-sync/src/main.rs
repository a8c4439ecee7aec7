use clap::Parser;
use tracing_subscriber::EnvFilter;
use viwoods_sync::config::{Cli, SyncConfig};
use viwoods_sync::runtime::{SyncRuntime, format_summary};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = SyncConfig::from_cli(cli);
    let runtime = SyncRuntime::bootstrap(config).await?;
    let report = runtime.run().await?;

    println!("{}", format_summary(&report, runtime.output_root()));
    Ok(())
}
