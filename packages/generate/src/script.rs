//! The dashboard behavior script.
//!
//! The script is rendered inline into the intermediate map page and then
//! extracted to `script.js`, which the page shell loads. Once written the
//! file belongs to the site maintainer and is only replaced on request.

use dengue_map_config::Config;
use dengue_map_dengue_models::RiskLevel;
use dengue_map_geography_models::LatLng;
use serde_json::{Value, json};

/// Data fetch emitted by the generator.
pub const DATA_FETCH: &str = "return fetch('data/dengue_data.json')";

/// Cache-bypassing replacement for [`DATA_FETCH`].
pub const CACHE_BUSTING_FETCH: &str = "var timestamp = new Date().getTime(); return fetch('data/dengue_data.json?t=' + timestamp, {cache: 'no-store'})";

const TEMPLATE: &str = r##"
    var map = L.map("map", {
        center: __CENTER__,
        crs: L.CRS.EPSG3857,
        zoom: __ZOOM__,
        zoomControl: __ZOOM_CONTROL__,
        preferCanvas: __PREFER_CANVAS__
    });

    L.tileLayer(__TILE_URL__, __TILE_OPTIONS__).addTo(map);

    var districtStyles = __STYLES__;
    var riskColors = __RISK_COLORS__;
    var nameField = __NAME_FIELD__;
    var tooltipFields = __TOOLTIP_FIELDS__;

    var districtLayers = {};
    var selectedDistrict = null;
    var dashboard = { districts: [], ovitraps: [], weather: null };

    function escapeHtml(value) {
        return String(value)
            .replace(/&/g, "&amp;")
            .replace(/</g, "&lt;")
            .replace(/>/g, "&gt;")
            .replace(/"/g, "&quot;");
    }

    function tooltipHtml(properties) {
        var rows = tooltipFields.map(function (field) {
            var value = properties[field];
            if (value === null || value === undefined) {
                value = "";
            }
            return "<tr><th>" + escapeHtml(field) + "</th><td>" + escapeHtml(value) + "</td></tr>";
        });
        return "<table>" + rows.join("") + "</table>";
    }

    function resetHighlight(name) {
        var layer = districtLayers[name];
        if (layer) {
            layer.setStyle(name === selectedDistrict ? districtStyles.selected : districtStyles.default);
        }
    }

    var districtLayer = L.geoJson(null, {
        style: function () {
            return districtStyles.default;
        },
        onEachFeature: function (feature, layer) {
            var name = feature.properties[nameField];
            if (name !== undefined && name !== null) {
                districtLayers[name] = layer;
            }
            layer.bindTooltip(tooltipHtml(feature.properties), {
                sticky: true,
                className: "foliumtooltip"
            });
            layer.on("mouseover", function () {
                if (name !== selectedDistrict) {
                    layer.setStyle(districtStyles.highlighted);
                }
            });
            layer.on("mouseout", function () {
                resetHighlight(name);
            });
            layer.on("click", function () {
                showDistrict(name);
            });
        }
    });
    districtLayer.addData(__DISTRICTS__);
    districtLayer.addTo(map);

    function setText(id, value) {
        var element = document.getElementById(id);
        if (element) {
            element.textContent = value;
        }
    }

    function findDistrict(name) {
        for (var i = 0; i < dashboard.districts.length; i++) {
            if (dashboard.districts[i].name === name) {
                return dashboard.districts[i];
            }
        }
        return null;
    }

    function showDistrict(name) {
        var previous = selectedDistrict;
        selectedDistrict = name;
        if (previous !== null) {
            resetHighlight(previous);
        }

        var layer = districtLayers[name];
        if (layer) {
            layer.setStyle(districtStyles.selected);
            map.fitBounds(layer.getBounds());
        }

        var panel = document.getElementById("info-panel");
        if (!panel) {
            return;
        }

        var record = findDistrict(name);
        setText("district-title", name);
        setText("population", record ? record.population.toLocaleString() : "-");
        setText("dengue-cases", record ? record.dengue_cases : "-");
        setText("rate-per-10k", record ? record.rate_per_10k.toFixed(2) : "-");
        setText("risk-level", record ? record.risk_level : "-");
        setText("last-update", record ? record.last_update : "-");

        var risk = document.getElementById("risk-level");
        if (risk) {
            risk.style.color = record ? (riskColors[record.risk_level] || "") : "";
        }

        var traps = dashboard.ovitraps.filter(function (trap) {
            return trap.district === name;
        });
        var eggs = traps.reduce(function (sum, trap) {
            return sum + trap.egg_count;
        }, 0);
        var detail = document.getElementById("detail-data");
        if (detail) {
            var html = "";
            if (traps.length > 0) {
                html += "<div>誘卵桶: " + traps.length + " / 卵數: " + eggs + "</div>";
            }
            if (dashboard.weather) {
                html += "<div>" + dashboard.weather.temperature + "°C / "
                    + dashboard.weather.humidity + "% / "
                    + dashboard.weather.rainfall + " mm</div>";
            }
            detail.innerHTML = html;
        }

        panel.style.display = "block";
    }

    function closePanel() {
        var panel = document.getElementById("info-panel");
        if (panel) {
            panel.style.display = "none";
        }
        var previous = selectedDistrict;
        selectedDistrict = null;
        if (previous !== null) {
            resetHighlight(previous);
        }
    }

    function renderDistrictList(districts) {
        var list = document.getElementById("district-list");
        if (!list) {
            return;
        }
        list.innerHTML = "";

        districts
            .slice()
            .sort(function (a, b) {
                return b.dengue_cases - a.dengue_cases;
            })
            .forEach(function (district, index) {
                var color = riskColors[district.risk_level] || "#999";
                var item = document.createElement("div");
                item.className = "district-item";
                item.style.cssText = "display: flex; justify-content: space-between; align-items: center; padding: 10px 10px 10px 28px; margin-bottom: 6px; border-radius: 8px; cursor: pointer; border-left: 4px solid " + color + ";";
                item.innerHTML = "<span class=\"rank-badge\">" + (index + 1) + "</span>"
                    + "<span class=\"district-name\">" + escapeHtml(district.name) + "</span>"
                    + "<span class=\"district-value\" style=\"color: " + color + ";\">" + district.value + "</span>";
                item.addEventListener("click", function () {
                    showDistrict(district.name);
                });
                list.appendChild(item);
            });
    }

    function loadDengueData() {
        return fetch('data/dengue_data.json')
            .then(function (response) {
                if (!response.ok) {
                    throw new Error("HTTP " + response.status);
                }
                return response.json();
            });
    }

    loadDengueData()
        .then(function (data) {
            dashboard.districts = data.districts || [];
            dashboard.ovitraps = data.ovitraps || [];
            dashboard.weather = data.weather || null;
            renderDistrictList(dashboard.districts);
        })
        .catch(function (error) {
            console.error("Failed to load dengue data:", error);
        });

    var closeButton = document.getElementById("close-panel");
    if (closeButton) {
        closeButton.addEventListener("click", closePanel);
    }
"##;

/// JSON text safe to place inside an inline `<script>` element.
fn script_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn style_json(style: &dengue_map_config::OutlineStyle) -> Value {
    json!({
        "color": style.color,
        "weight": style.weight,
        "fillOpacity": style.fill_opacity,
        "opacity": style.opacity,
    })
}

/// Renders the behavior script for a map centered on `center`.
///
/// `districts` is the `GeoJSON` `FeatureCollection` embedded in the
/// script; `tooltip_fields` are listed in every tooltip in order.
#[must_use]
pub fn render(
    config: &Config,
    center: LatLng,
    districts: &Value,
    tooltip_fields: &[&str],
) -> String {
    let map = &config.map;
    let tile_options = json!({
        "attribution": map.tile_attribution,
        "minZoom": map.tile_min_zoom,
        "maxZoom": map.tile_max_zoom,
    });
    let styles = json!({
        "default": style_json(&config.style.default),
        "highlighted": style_json(&config.style.highlighted),
        "selected": style_json(&config.style.selected),
    });
    let risk_colors: serde_json::Map<String, Value> = RiskLevel::all()
        .iter()
        .map(|level| {
            (
                level.to_string(),
                Value::from(config.risk.colors.color_for(*level)),
            )
        })
        .collect();

    TEMPLATE
        .replace("__CENTER__", &script_json(&json!([center.lat, center.lng])))
        .replace("__ZOOM__", &script_json(&json!(map.zoom_start)))
        .replace("__ZOOM_CONTROL__", &map.zoom_control.to_string())
        .replace("__PREFER_CANVAS__", &map.prefer_canvas.to_string())
        .replace("__TILE_URL__", &script_json(&Value::from(map.tile_url.as_str())))
        .replace("__TILE_OPTIONS__", &script_json(&tile_options))
        .replace("__STYLES__", &script_json(&styles))
        .replace("__RISK_COLORS__", &script_json(&Value::Object(risk_colors)))
        .replace("__NAME_FIELD__", &script_json(&Value::from(map.name_field.as_str())))
        .replace("__TOOLTIP_FIELDS__", &script_json(&json!(tooltip_fields)))
        // Last, so placeholder-like text inside the data is left alone.
        .replace("__DISTRICTS__", &script_json(districts))
}

/// Rewrites the data fetch so browsers always load fresh data.
#[must_use]
pub fn apply_cache_busting(script: &str) -> String {
    script.replace(DATA_FETCH, CACHE_BUSTING_FETCH)
}
