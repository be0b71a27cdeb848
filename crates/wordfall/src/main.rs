use tracing_subscriber::EnvFilter;
use wordfall::prelude::*;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<(), WordfallError> {
    let config = ServerConfig::from_env()?;
    init_tracing();

    tracing::info!(
        addr = %config.bind_addr,
        max_rooms = config.registry.max_rooms,
        max_players = config.registry.room.max_players,
        tick_rate = config.registry.room.tick_rate_hz,
        "starting wordfall"
    );

    let words = StaticWordSupplier::new();
    tracing::debug!(words = words.len(), "loaded built-in word list");
    let supplier = RetryingSupplier::new(words, config.supplier.clone());

    let server = WordfallServerBuilder::from_config(&config)
        .build(supplier)
        .await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
