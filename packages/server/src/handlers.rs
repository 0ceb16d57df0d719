//! HTTP handler functions for the dengue map server.

use std::sync::PoisonError;

use actix_web::{HttpResponse, web};
use dengue_map_generate::{ComposeOptions, ComposeReport, regenerate};
use dengue_map_server_models::{ApiHealth, ApiUpdateResponse};

use crate::{AppState, ServerError};

/// Runs the regeneration pipeline on the blocking pool, one run at a time.
async fn regenerate_map(state: &web::Data<AppState>) -> Result<ComposeReport, ServerError> {
    let state = state.clone();
    let report = web::block(move || {
        let _guard = state
            .regenerate_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        regenerate(&state.config, &ComposeOptions::default())
    })
    .await??;

    log::info!(
        "Map regenerated with {} districts centered at {}",
        report.feature_count,
        report.center
    );
    Ok(report)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /`
///
/// Regenerates the map and serves the dashboard page. A failed
/// regeneration falls back to the last page written, if any.
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    if let Err(e) = regenerate_map(&state).await {
        log::error!("Failed to update map: {e}");
    }

    let page = state.config.paths.map_html();
    let read = {
        let page = page.clone();
        web::block(move || std::fs::read_to_string(page)).await
    };
    match read {
        Ok(Ok(html)) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html),
        Ok(Err(e)) => {
            log::error!("Failed to read {}: {e}", page.display());
            map_unavailable()
        }
        Err(e) => {
            log::error!("Failed to read {}: {e}", page.display());
            map_unavailable()
        }
    }
}

fn map_unavailable() -> HttpResponse {
    HttpResponse::ServiceUnavailable()
        .content_type("text/plain; charset=utf-8")
        .body("Map is not available yet")
}

/// `GET /api/update-map`
pub async fn update_map(state: web::Data<AppState>) -> HttpResponse {
    match regenerate_map(&state).await {
        Ok(_) => HttpResponse::Ok().json(ApiUpdateResponse::success()),
        Err(e) => {
            log::error!("Failed to update map: {e}");
            HttpResponse::InternalServerError().json(ApiUpdateResponse::error(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use dengue_map_config::Config;
    use dengue_map_server_models::ApiStatus;

    use super::*;

    const BOUNDARIES: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"TOWNNAME":"安平區","TOWNID":"D01"},
         "geometry":{"type":"Polygon","coordinates":[[[120.15,22.98],[120.2,22.98],[120.2,23.02],[120.15,23.02],[120.15,22.98]]]}},
        {"type":"Feature","properties":{"TOWNNAME":"東區","TOWNID":"D02"},
         "geometry":{"type":"Polygon","coordinates":[[[120.21,22.97],[120.25,22.97],[120.25,23.0],[120.21,23.0],[120.21,22.97]]]}}
    ]}"#;

    fn config(root: &Path) -> Config {
        let mut config = Config::default();
        config.paths.root = root.to_path_buf();
        config
    }

    fn with_boundaries(root: &Path) -> Config {
        let config = config(root);
        let path = config.paths.district_boundaries_geojson();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, BOUNDARIES).unwrap();
        config
    }

    macro_rules! app {
        ($config:expr) => {{
            let config = Arc::new($config);
            let state = web::Data::new(AppState::new(config.clone()));
            test::init_service(
                App::new()
                    .app_data(state)
                    .configure(|cfg| crate::configure(cfg, &config)),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app!(config(tmp.path()));

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: ApiHealth = test::call_and_read_body_json(&app, req).await;

        assert!(body.healthy);
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn update_map_regenerates() {
        let tmp = tempfile::tempdir().unwrap();
        let config = with_boundaries(tmp.path());
        let script = config.paths.script_js();
        let app = app!(config);

        let req = test::TestRequest::get().uri("/api/update-map").to_request();
        let body: ApiUpdateResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, ApiUpdateResponse::success());
        assert!(script.exists());
    }

    #[actix_web::test]
    async fn update_map_failure_is_500() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app!(config(tmp.path()));

        let req = test::TestRequest::get().uri("/api/update-map").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: ApiUpdateResponse = test::read_body_json(resp).await;
        assert_eq!(body.status, ApiStatus::Error);
        assert!(!body.message.is_empty());
    }

    #[actix_web::test]
    async fn index_serves_regenerated_page() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app!(with_boundaries(tmp.path()));

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/html; charset=utf-8"
        );

        let body = test::read_body(resp).await;
        let html = std::str::from_utf8(&body).unwrap();
        assert!(html.contains("<script src=\"/template/script.js\"></script>"));
    }

    #[actix_web::test]
    async fn index_falls_back_to_previous_page() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        std::fs::create_dir_all(config.paths.template_dir()).unwrap();
        std::fs::write(config.paths.map_html(), "<html>previous</html>").unwrap();
        let app = app!(config);

        let req = test::TestRequest::get().uri("/").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(&body[..], b"<html>previous</html>");
    }

    #[actix_web::test]
    async fn index_without_any_page_is_503() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app!(config(tmp.path()));

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn index_with_unreadable_page_is_503() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        std::fs::create_dir_all(config.paths.map_html()).unwrap();
        let app = app!(config);

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"Map is not available yet");
    }

    #[actix_web::test]
    async fn data_mount_serves_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        std::fs::create_dir_all(config.paths.data_dir()).unwrap();
        std::fs::write(config.paths.dengue_data_json(), r#"{"districts":[]}"#).unwrap();
        let app = app!(config);

        let req = test::TestRequest::get()
            .uri("/data/dengue_data.json")
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(&body[..], br#"{"districts":[]}"#);
    }
}
