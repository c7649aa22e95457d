//! Authenticated proxy to the historic weather archive

use actix_web::{middleware, App, HttpServer};
use color_eyre::Result;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

use crate::config::{Config, LogFormat};
use crate::db::UserStore;
use crate::service::AppState;

mod accounts;
mod auth;
mod config;
mod db;
mod error;
mod models;
mod service;
mod user_handlers;
mod weather;

/// Initializes tracing collection
fn setup_tracing(format: LogFormat) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let fmt_layer = match format {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    setup_tracing(config.log_format);
    color_eyre::install()?;

    if config.uses_default_secret() {
        warn!("JWT_SECRET and SECRET_KEY are not set, signing tokens with the built-in development secret");
    }

    let store = UserStore::connect(&config.database_url).await?;
    let state = AppState::with_config(&config, store)?;
    let service_config = service::configure(state);

    info!(addr = %config.bind_addr, "Listening");
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::NormalizePath::trim())
            .wrap(TracingLogger::default())
            .configure(service_config.clone())
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    info!("Service stopped, tearing down");
    Ok(())
}
