#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone dengue map server.
//!
//! Reads the config file named by `DENGUE_MAP_CONFIG` (defaults otherwise)
//! and serves the dashboard.

use std::path::PathBuf;

use dengue_map_config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let path = std::env::var_os("DENGUE_MAP_CONFIG").map(PathBuf::from);
    let config = Config::load(path.as_deref()).map_err(std::io::Error::other)?;

    for issue in config.issues() {
        log::warn!("Config issue: {issue}");
    }

    dengue_map_server::run_server(config).await
}
