use anyhow::Context;
use ripchat::{AppState, Config, app};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ripchat=info".parse()?))
        .init();

    let config = Config::from_env()?;
    let addr = config.addr();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("ripchat listening on {addr}");

    axum::serve(listener, app(AppState::new(config))).await?;
    Ok(())
}
