use std::io;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Builder;
use log::{info, LevelFilter};

use twitter_api::config::Config;
use twitter_api::{configure, db, AppState};

#[actix_web::main]
async fn main() -> io::Result<()> {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    info!("Starting Twitter API backend...");
    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let store = db::create_store(&config).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    info!("Using user store {}", config.store_path.display());

    let state = web::Data::new(AppState {
        store,
        bcrypt_cost: config.bcrypt_cost,
    });

    info!(
        "Listening on {} with {} workers",
        config.bind_addr, config.workers
    );
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .workers(config.workers)
    .bind(config.bind_addr)?
    .run()
    .await
}
