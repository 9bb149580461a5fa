use std::sync::Arc;

use actix::Actor;
use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{info, warn};

use crm_backend::app_state::AppState;
use crm_backend::config::Config;
use crm_backend::db::{ensure_indexes, MemoryStore, MongoStore, Store};
use crm_backend::event_hub::{EventHub, EventPublisher};

async fn open_store(config: &Config) -> std::io::Result<Arc<dyn Store>> {
    if config.uses_memory_store() {
        warn!("Using the in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = MongoStore::init(&config.mongo_uri, &config.database_name, config.store_timeout)
        .await
        .map_err(std::io::Error::other)?;
    Ok(Arc::new(store))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let store = open_store(&config).await?;

    // an unreachable database must not keep the API from starting
    let background = store.clone();
    actix_web::rt::spawn(async move {
        match background.ping().await {
            Ok(()) => info!("Document store reachable"),
            Err(e) => warn!("Document store unreachable: {}", e),
        }
        if let Err(e) = ensure_indexes(background.as_ref()).await {
            warn!("Could not create indexes: {}", e);
        }
    });

    let hub = EventHub::new().start();
    let state = web::Data::new(AppState::new(store, EventPublisher::new(hub), config.clone()));

    let bind = (config.host.clone(), config.port);
    info!("Server running at http://{}:{}", bind.0, bind.1);
    info!("Allowed CORS Origin: {}", config.frontend_origin);

    let frontend_origin = config.frontend_origin.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(crm_backend::configure)
    })
    .bind(bind)?
    .run()
    .await
}
