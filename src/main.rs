use std::sync::Arc;
use actix_web::{App, HttpServer, HttpResponse, web};
use actix_cors::Cors;
use log::{info, error};
use dotenv::dotenv;
mod models;
mod handlers;
mod routes;
mod services;
mod utils;
mod config;
use config::{AppConfig, StoreBackend};
use services::{DocumentStore, FirestoreStore, GoogleVerifier, MemoryStore, ServiceSettings, Services};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().filter_or("LOG_LEVEL", "info"));
    let config = AppConfig::from_env()?;

    let store: Arc<dyn DocumentStore> = match (config.backend, &config.firestore) {
        (StoreBackend::Firestore, Some(firestore)) => {
            info!("Using Firestore project {} (database {})", firestore.project_id, firestore.database);
            Arc::new(FirestoreStore::new(firestore))
        }
        (StoreBackend::Firestore, None) => {
            error!("Firestore backend selected without Firestore settings");
            return Err("FIRESTORE_PROJECT_ID must be set".into());
        }
        (StoreBackend::Memory, _) => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    if config.google_client_id.is_none() {
        info!("GOOGLE_CLIENT_ID not set; Google ID token audience will not be checked");
    }
    let identity = Arc::new(GoogleVerifier::new(config.google_client_id.clone()));

    let services = Services::new(
        store,
        identity,
        ServiceSettings {
            tz_offset_hours: config.withdrawal_tz_offset_hours,
            min_withdrawal: config.min_withdrawal,
            ..ServiceSettings::default()
        },
    );

    let (host, port) = (config.host.clone(), config.port);
    info!("Starting server at http://{}:{}", host, port);

    HttpServer::new(move || {
        // Configure CORS middleware
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_headers(vec!["content-type", "content-length", "accept"])
            .max_age(3600);

        let services = services.clone();
        App::new()
            .wrap(cors)
            .configure(move |cfg| services.configure(cfg))
            .configure(routes::configure)
            .route("/health", web::get().to(|| async {
                info!("Health check");
                HttpResponse::Ok().body("OK")
            }))
    })
    .bind(format!("{host}:{port}"))?
    .run()
    .await?;

    info!("Server shutting down");
    Ok(())
}
