use anyhow::Context;
use clap::Parser;
use pw_dispatch_server::{ServerConfig, cli::Cli, logging, serve_stdio};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    install_fatal_panic_hook();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }

    // stdin is read on a blocking thread that never returns on its own.
    std::process::exit(0);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ServerConfig::from_cli(&cli).context("invalid configuration")?;
    serve_stdio(config).await
}

/// Protocol-invariant violations panic, possibly inside a spawned handler
/// task; the process must not outlive them.
fn install_fatal_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("fatal: {info}");
        default_hook(info);
        std::process::exit(101);
    }));
}
