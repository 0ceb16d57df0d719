#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web front door for the dengue map dashboard.
//!
//! Visiting `/` regenerates the map before serving it, `/api/update-map`
//! regenerates on demand, and the web, data and template directories are
//! served as static mounts so the page shell can load its script and the
//! dashboard can fetch its data.

mod handlers;

use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use dengue_map_config::Config;

/// Errors raised while regenerating the map for a request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The regeneration pipeline failed.
    #[error(transparent)]
    Generate(#[from] dengue_map_generate::GenerateError),

    /// The blocking worker running the pipeline was cancelled.
    #[error("regeneration task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

/// Shared application state.
pub struct AppState {
    pub config: Arc<Config>,
    /// Serializes map regeneration so concurrent requests never interleave
    /// writes to the generated files.
    pub regenerate_lock: Mutex<()>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            regenerate_lock: Mutex::new(()),
        }
    }
}

/// CORS policy for `origins`; any `*` entry allows every origin.
fn cors(origins: &[String]) -> Cors {
    if origins.iter().any(|o| o == "*") {
        return Cors::permissive();
    }
    origins
        .iter()
        .fold(Cors::default().allowed_methods(["GET"]), |cors, origin| {
            cors.allowed_origin(origin)
        })
}

/// Registers the API routes, the dashboard page and the static mounts.
pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.route("/", web::get().to(handlers::index)).service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/update-map", web::get().to(handlers::update_map)),
    );

    for mount in &config.server.static_mounts {
        let dir = config.mount_dir(mount.target);
        log::debug!("Serving {} from {}", mount.prefix, dir.display());
        cfg.service(Files::new(&mount.prefix, dir));
    }
}

/// Starts the dashboard server on `server.host:server.port`.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: Config) -> std::io::Result<()> {
    let config = Arc::new(config);
    let state = web::Data::new(AppState::new(config.clone()));
    let bind_addr = (config.server.host.clone(), config.server.port);

    log::info!("Starting server on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        let config = config.clone();
        App::new()
            .wrap(cors(&config.server.cors_origins))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(move |cfg| configure(cfg, &config))
    })
    .bind(bind_addr)?
    .run()
    .await
}
