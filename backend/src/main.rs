use std::env;
use std::io;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use cropguard_backend::config::AppConfig;
use cropguard_backend::state::AppState;
use cropguard_backend::{pages, routes};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = AppConfig::load();
    let debug = config.as_ref().map(|c| c.server.debug).unwrap_or(false);
    let default_filter = if debug {
        "info,cropguard_backend=debug"
    } else {
        "info"
    };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let config = config.map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let state = AppState::from_config(&config).map_err(|e| {
        log::error!("Failed to initialise the recommendation client: {}", e);
        io::Error::other(e.to_string())
    })?;
    let state = web::Data::new(state);
    let frontend_dir = config.server.frontend_dir.clone();

    log::info!(
        "Starting server on {}:{} (frontend at {})",
        config.server.host,
        config.server.port,
        frontend_dir.display()
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        header::AUTHORIZATION,
                        header::ACCEPT,
                        header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(state.clone())
            .configure(routes::configure_routes)
            .configure(|cfg| pages::configure_pages(cfg, frontend_dir.clone()))
            .default_service(web::to(routes::not_found))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
