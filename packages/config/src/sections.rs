//! Configuration sections and their defaults.

use std::path::PathBuf;

use dengue_map_dengue_models::{RiskLevel, RiskThresholds};
use dengue_map_geography_models::{Crs, LatLng};
use serde::{Deserialize, Serialize};

/// Application identity shown in page titles and the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "台南市登革熱疫情資料系統".to_string(),
            version: "1.0.0".to_string(),
            description: "台南市登革熱疫情監控與視覺化系統".to_string(),
        }
    }
}

/// Which configured directory a static URL prefix serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountTarget {
    Web,
    Data,
    Template,
}

/// A URL prefix mapped to an on-disk directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMount {
    pub prefix: String,
    pub target: MountTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_mounts: Vec<StaticMount>,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            static_mounts: vec![
                StaticMount {
                    prefix: "/Home".to_string(),
                    target: MountTarget::Web,
                },
                StaticMount {
                    prefix: "/data".to_string(),
                    target: MountTarget::Data,
                },
                StaticMount {
                    prefix: "/template".to_string(),
                    target: MountTarget::Template,
                },
            ],
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Leaflet map setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Fixed center as `[lat, lng]`, used when `use_dynamic_center` is off.
    pub center: [f64; 2],
    /// Center the map on the mean of the district centroids.
    pub use_dynamic_center: bool,
    pub zoom_start: f64,
    pub zoom_control: bool,
    pub prefer_canvas: bool,
    pub tile_url: String,
    pub tile_attribution: String,
    pub tile_min_zoom: u8,
    pub tile_max_zoom: u8,
    /// Feature property holding the district name; links map features to
    /// sidebar entries.
    pub name_field: String,
    /// Layer name of the district boundaries.
    pub layer_name: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [23.126_724_381_730_643, 120.370_033_786_406_75],
            use_dynamic_center: true,
            zoom_start: 10.5,
            zoom_control: true,
            prefer_canvas: false,
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            tile_attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors".to_string(),
            tile_min_zoom: 0,
            tile_max_zoom: 19,
            name_field: "TOWNNAME".to_string(),
            layer_name: "行政區".to_string(),
        }
    }
}

impl MapConfig {
    #[must_use]
    pub fn fixed_center(&self) -> LatLng {
        LatLng::from(self.center)
    }
}

/// Outline style applied to a district polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineStyle {
    pub color: String,
    pub weight: f64,
    pub fill_opacity: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub default: OutlineStyle,
    pub highlighted: OutlineStyle,
    pub selected: OutlineStyle,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            default: OutlineStyle {
                color: "#1f78b4".to_string(),
                weight: 2.0,
                fill_opacity: 0.0,
                opacity: 1.0,
            },
            highlighted: OutlineStyle {
                color: "#ff6b6b".to_string(),
                weight: 3.0,
                fill_opacity: 0.3,
                opacity: 1.0,
            },
            selected: OutlineStyle {
                color: "#4ecdc4".to_string(),
                weight: 3.0,
                fill_opacity: 0.5,
                opacity: 1.0,
            },
        }
    }
}

/// Coordinate systems of the boundary data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrsConfig {
    /// Assumed source CRS when a file does not declare one.
    pub input_crs: Crs,
    /// CRS written by the converter.
    pub output_crs: Crs,
}

impl Default for CrsConfig {
    fn default() -> Self {
        Self {
            input_crs: Crs::TWD97_TM2,
            output_crs: Crs::WGS84,
        }
    }
}

/// Page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub page_title: String,
    pub sidebar_title: String,
    pub sidebar_icon: String,
    pub population_label: String,
    pub dengue_cases_label: String,
    pub rate_per_10k_label: String,
    pub risk_level_label: String,
    pub last_update_label: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_title: "台南市登革熱疫情資料".to_string(),
            sidebar_title: "行政區列表".to_string(),
            sidebar_icon: "fas fa-map-marked-alt".to_string(),
            population_label: "人口數據".to_string(),
            dengue_cases_label: "登革熱病例".to_string(),
            rate_per_10k_label: "每萬人病例率".to_string(),
            risk_level_label: "風險等級".to_string(),
            last_update_label: "更新時間".to_string(),
        }
    }
}

/// Sidebar color per risk level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskColors {
    pub low: String,
    pub medium: String,
    pub high: String,
    pub extreme: String,
}

impl RiskColors {
    #[must_use]
    pub fn color_for(&self, level: RiskLevel) -> &str {
        match level {
            RiskLevel::Low => &self.low,
            RiskLevel::Medium => &self.medium,
            RiskLevel::High => &self.high,
            RiskLevel::Extreme => &self.extreme,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub thresholds: RiskThresholds,
    pub colors: RiskColors,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            colors: RiskColors {
                low: "#3742fa".to_string(),
                medium: "#2ed573".to_string(),
                high: "#ffa502".to_string(),
                extreme: "#ff4757".to_string(),
            },
        }
    }
}

/// A portal dataset to download and the snapshot file it overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Title attribute of the dataset entry on the portal page.
    pub title: String,
    /// Output file, relative to the data directory.
    pub file: PathBuf,
}

/// Open-data portal refresh settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub portal_url: String,
    pub datasets: Vec<DatasetConfig>,
    /// JSON API endpoint used by `refresh --direct`.
    pub direct_url: String,
    /// Address of a running chromedriver.
    pub webdriver_url: String,
    pub headless: bool,
    pub wait_timeout_secs: u64,
    pub scroll_delay_ms: u64,
    pub scroll_step_px: i64,
    pub max_retries: u32,
    /// Continue with the export step when the dataset entry could not be
    /// located after `max_retries` attempts.
    pub proceed_on_exhausted: bool,
    /// Informational; refreshes are triggered externally.
    pub update_interval_hours: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            portal_url:
                "https://data.tainan.gov.tw/DataSet/Detail/4ad2dba4-4fed-4224-9456-c6ac776cb1cd"
                    .to_string(),
            datasets: vec![DatasetConfig {
                title: "誘卵桶點位".to_string(),
                file: PathBuf::from(crate::paths::BUCKET_JSON),
            }],
            direct_url:
                "https://soa.tainan.gov.tw/Api/Service/Get/e8d4f9f8-5f11-4e48-9a25-1684ccce49a6"
                    .to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            wait_timeout_secs: 3,
            scroll_delay_ms: 500,
            scroll_step_px: 500,
            max_retries: 10,
            proceed_on_exhausted: true,
            update_interval_hours: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Rewrite the behavior script's data fetch to bypass browser caches.
    pub enable_cache_busting: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_cache_busting: true,
        }
    }
}
