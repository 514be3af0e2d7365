mod config;
mod credentials;
mod errors;
mod forwarder;
mod handlers;
mod models;
#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use log::info;
use std::sync::Arc;

use config::Config;
use credentials::{CredentialSource, GoogleTokenProvider, TokenProvider};
use forwarder::PredictionForwarder;

fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
    if let Ok(path) = dotenv {
        info!("loaded environment from {}", path.display());
    }

    let config = Config::from_env()?;
    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let source = CredentialSource::from_config(&config)?;
    let tokens: Arc<dyn TokenProvider> = Arc::new(GoogleTokenProvider::new(source, http.clone()));
    let forwarder = web::Data::new(PredictionForwarder::new(http, config.endpoint_url(), tokens));

    info!("forwarding predictions to {}", forwarder.endpoint_url());
    info!("Server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors())
            .app_data(forwarder.clone())
            .configure(handlers::configure)
    })
    .bind(config.bind_address())?
    .run()
    .await?;

    Ok(())
}
