use actix_web::{App, HttpServer, web};
use log::info;
use std::io;

use removable_disk::app_state::AppState;
use removable_disk::config::{AppConfig, DEFAULT_LOG_CONFIG_PATH};
use removable_disk::{logging, service};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let log_handle = logging::init(DEFAULT_LOG_CONFIG_PATH);

    let config = AppConfig::load()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    logging::reconfigure(log_handle.as_ref(), DEFAULT_LOG_CONFIG_PATH, &config.logging);

    let (host, port, workers) = (config.server.host.clone(), config.server.port, config.server.workers);
    let state = AppState::from_config(config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let state = web::Data::new(state);

    info!("Starting removable disk server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(state.clone())
            .configure(service::configure)
    })
    .workers(workers.max(1))
    .bind((host.as_str(), port))?
    .run()
    .await
}
