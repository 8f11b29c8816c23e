//! HTTP layer for SkyCast.
//!
//! Routes weather requests to `WeatherService` and account requests to
//! `AccountStore`, and renders every failure as `{"error": message}`.

pub mod error;
pub mod handlers;
pub mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use skycast_accounts::AccountStore;
use skycast_weather::WeatherService;

pub use error::ApiError;
pub use routes::routes;

/// Shared services handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<WeatherService>,
    pub accounts: Arc<AccountStore>,
}

impl AppState {
    pub fn new(weather: WeatherService, accounts: AccountStore) -> Self {
        Self {
            weather: Arc::new(weather),
            accounts: Arc::new(accounts),
        }
    }
}

/// Serve until `shutdown` resolves.
///
/// # Errors
/// Returns an error if the address cannot be bound.
pub async fn serve<F>(state: AppState, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("SkyCast listening on http://{}", bound);
    server.await;
    tracing::info!("SkyCast server stopped");
    Ok(())
}
