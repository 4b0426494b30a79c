use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use actix_web_prom::PrometheusMetricsBuilder;
use dotenv::dotenv;
use env_logger::Env;
use log::info;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;

use ecotrip_backend::config::EngineConfig;
use ecotrip_backend::engine::progress::NoopGroupProgress;
use ecotrip_backend::engine::MobilityEngine;
use ecotrip_backend::geo::GeoLookup;
use ecotrip_backend::handlers;
use ecotrip_backend::store::postgres::PgStore;

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().map(PathBuf::from)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Initialize the database pool. The acquire timeout bounds every
    // persistence call issued by the engine.
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(5);
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
        .connect(&database_url)
        .await
        .expect("Failed to connect to the database");

    // Load the static reference datasets once; missing files degrade to
    // speed-only mode classification.
    let geo = GeoLookup::from_json_files(
        env_path("BUS_STOPS_PATH").as_deref(),
        env_path("SUBWAY_STATIONS_PATH").as_deref(),
        env_path("BIKE_STATIONS_PATH").as_deref(),
    );

    let engine = MobilityEngine::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(geo),
        EngineConfig::from_env(),
        Arc::new(NoopGroupProgress),
    );
    let engine = web::Data::new(engine);

    // Fetch the server bind address from an environment variable, default to "127.0.0.1:8080"
    let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    info!("Starting server at {}", bind_address);

    // Set up Prometheus metrics
    let mut labels = HashMap::new();
    labels.insert("app".to_string(), "ecotrip_backend".to_string());
    let prometheus = PrometheusMetricsBuilder::new("api")
        .endpoint("/metrics")
        .const_labels(labels)
        .build()
        .expect("Failed to create Prometheus metrics");

    // Start the HTTP server
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default()) // Logging middleware
            .wrap(prometheus.clone()) // Prometheus metrics middleware
            .app_data(engine.clone())
            .service(
                web::resource("/v1/activity")
                    .route(web::post().to(handlers::activity::log_activity)),
            )
            .service(
                web::resource("/v1/dashboard")
                    .route(web::get().to(handlers::activity::get_dashboard)),
            )
            .service(
                web::resource("/v1/challenges")
                    .route(web::get().to(handlers::challenge::list_challenges))
                    .route(web::post().to(handlers::challenge::create_challenge)),
            )
            .service(
                web::resource("/v1/challenges/{challengeId}/join")
                    .route(web::post().to(handlers::challenge::join_challenge)),
            )
            .service(
                web::resource("/v1/challenges/{challengeId}/complete")
                    .route(web::post().to(handlers::challenge::complete_challenge)),
            )
            .service(
                web::resource("/v1/challenges/{challengeId}/progress")
                    .route(web::get().to(handlers::challenge::challenge_progress)),
            )
            .service(
                web::resource("/v1/achievements")
                    .route(web::get().to(handlers::challenge::get_achievements)),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
