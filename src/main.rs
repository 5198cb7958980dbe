use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use nordpool_prices::{Config, Prices};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod routes;

#[derive(Clone)]
pub struct AppState {
    pub prices: Arc<Prices>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        "Using {} prices in {} from {}",
        config.currency, config.timezone, config.base_url
    );

    let prices = Prices::new(config)?;
    let port = prices.config().port;
    let state = AppState {
        prices: Arc::new(prices),
    };

    let app = Router::new()
        .route("/prices/at", get(routes::prices::at))
        .route("/prices/{granularity}", get(routes::prices::range))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
