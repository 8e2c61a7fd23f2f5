use clap::Parser;
use storefront_rec::{api, init_tracing, AppState, Config};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Storefront recommendation server", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Overrides `server.port` from the configuration.
    #[arg(short, long)]
    port: Option<u16>,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers)
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;
    info!(
        "Starting storefront recommendation server with {} workers, storage {:?}, catalog {:?}",
        config.server.workers, config.storage.backend, config.catalog.backend
    );

    let state = AppState::new(config).await?;
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_accept_log_level() {
        Args::command().debug_assert();

        let args = Args::try_parse_from(["storefront-rec-server", "--log-level", "debug", "-p", "9000"]).unwrap();
        assert_eq!(args.log_level, "debug");
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.config, "config/default.toml");

        let defaults = Args::try_parse_from(["storefront-rec-server"]).unwrap();
        assert_eq!(defaults.log_level, "info");
    }
}
