use flux::config::Config;
use flux::handlers::DemoHandler;
use flux::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let server = Server::serve(cfg.server.port, DemoHandler::new(cfg.assets.clone())).await?;
    tracing::info!("Server started on port {}", cfg.server.port);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    server.close();
    server.join().await;
    tracing::info!("Server gracefully stopped");

    Ok(())
}
