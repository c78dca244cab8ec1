pub(crate) mod controllers;
pub(crate) mod core;
pub(crate) mod routes;
pub(crate) mod types;
pub(crate) mod utils;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use crate::core::config::{Args, ErrorPolicy};
pub use crate::core::error::{ConfigError, Error};
pub use crate::core::state::AppState;
pub use crate::routes::router::routes;

pub async fn run() -> Result<(), ConfigError> {
    let config = Args::load()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&config.log_level).unwrap_or_default())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::new(&config).await?;

    let app = routes(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(ConfigError::IO)?;

    tracing::info!(
        error_policy = ?config.error_policy,
        "listening on port {}",
        config.port
    );

    axum::serve(listener, app).await.map_err(ConfigError::IO)?;

    Ok(())
}
