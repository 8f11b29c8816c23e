use anyhow::{Context, Result};

use skycast_accounts::AccountStore;
use skycast_core::Config;
use skycast_server::AppState;
use skycast_weather::{WeatherCache, WeatherProvider, WeatherService};

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;

    let (config, _) = Config::load_validated()?;
    tracing::info!("Configuration: {:?}", config);

    let provider = WeatherProvider::new(
        &config.weather_base_url,
        config.weather_api_key.clone(),
        config.request_timeout(),
    )
    .context("Failed to create weather provider")?;
    let cache = WeatherCache::new(&config.cache_dir, config.cache_ttl());
    let weather = WeatherService::new(provider, cache);

    let accounts = AccountStore::new(&config.db_path)
        .with_context(|| format!("Failed to open account database {:?}", config.db_path))?;

    let addr = config.socket_addr()?;
    let state = AppState::new(weather, accounts);

    skycast_server::serve(state, addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    })
    .await
}
