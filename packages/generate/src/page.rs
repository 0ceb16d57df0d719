//! HTML rendering for the intermediate map page and the dashboard shell.

use std::fmt::Write as _;

use dengue_map_config::{Config, MountTarget};

/// Leaflet, jQuery, Bootstrap and Font Awesome assets shared by both pages.
const HEAD_ASSETS: &str = r#"    <meta http-equiv="content-type" content="text/html; charset=UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no" />
    <script src="https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.js"></script>
    <script src="https://code.jquery.com/jquery-3.7.1.min.js"></script>
    <script src="https://cdn.jsdelivr.net/npm/bootstrap@5.2.2/dist/js/bootstrap.bundle.min.js"></script>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.css"/>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.2.2/dist/css/bootstrap.min.css"/>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/@fortawesome/fontawesome-free@6.2.0/css/all.min.css"/>
    <style>
        html, body { width: 100%; height: 100%; margin: 0; padding: 0; }
        #map { position: absolute; top: 0; bottom: 0; right: 0; left: 0; }
        .leaflet-container { font-size: 1rem; }
        .foliumtooltip { display: inline-block; }
        .foliumtooltip table { margin: auto; }
        .foliumtooltip tr { text-align: left; }
        .foliumtooltip th { padding: 2px; padding-right: 8px; }
    </style>
"#;

const DASHBOARD_STYLES: &str = r"    <style>
        #sidebar::-webkit-scrollbar { width: 8px; }
        #sidebar::-webkit-scrollbar-track { background: #f1f1f1; border-radius: 10px; }
        #sidebar::-webkit-scrollbar-thumb { background: #888; border-radius: 10px; }
        #sidebar::-webkit-scrollbar-thumb:hover { background: #555; }
        .sidebar-title {
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white !important;
            margin: -20px -20px 20px -20px;
            padding: 20px;
            border-radius: 8px 8px 0 0;
            text-align: center;
            font-weight: bold;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        .district-item { position: relative; overflow: hidden; background: #fff; }
        .district-item:hover { background: #f5f6ff; }
        .district-name { font-weight: 600; color: #333; }
        .district-value {
            font-weight: bold;
            padding: 2px 10px;
            border-radius: 12px;
            background: rgba(0,0,0,0.05);
            font-size: 13px;
        }
        .rank-badge {
            position: absolute;
            left: 2px;
            top: 50%;
            transform: translateY(-50%);
            width: 22px;
            height: 22px;
            border-radius: 50%;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            display: flex;
            align-items: center;
            justify-content: center;
            font-size: 11px;
            font-weight: bold;
        }
        #header { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%) !important; }
        #header h2 { color: white !important; text-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        #info-panel p { margin: 8px 0; padding: 8px; background: #f8f9fa; border-radius: 6px; }
        #info-panel strong { color: #667eea; font-weight: 600; }
    </style>
";

/// Escapes text for HTML element content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// URL prefix of the first static mount serving `target`.
fn mount_prefix(config: &Config, target: MountTarget) -> Option<&str> {
    config
        .server
        .static_mounts
        .iter()
        .find(|m| m.target == target)
        .map(|m| m.prefix.trim_end_matches('/'))
}

/// Standalone map page with the behavior script inline.
#[must_use]
pub fn render_map_page(config: &Config, script: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    let _ = writeln!(
        html,
        "    <title>{}</title>",
        escape_html(&config.ui.page_title)
    );
    html.push_str(HEAD_ASSETS);
    html.push_str("</head>\n<body>\n");
    html.push_str("    <div class=\"folium-map\" id=\"map\"></div>\n");
    html.push_str("<script>");
    html.push_str(script);
    html.push_str("</script>\n</body>\n</html>\n");
    html
}

/// The inline script body of a page rendered by [`render_map_page`].
#[must_use]
pub fn extract_inline_script(html: &str) -> Option<&str> {
    let start = html.find("<script>")? + "<script>".len();
    let len = html[start..].find("</script>")?;
    Some(&html[start..start + len])
}

/// The dashboard page: header, district sidebar, detail panel and map
/// container, loading the behavior script from the template mount.
///
/// Depends only on `config`, so repeated renders are byte-identical.
#[must_use]
pub fn render_shell(config: &Config, with_stylesheet: bool) -> String {
    let ui = &config.ui;
    let template_prefix = mount_prefix(config, MountTarget::Template).unwrap_or("/template");

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    let _ = writeln!(html, "    <title>{}</title>", escape_html(&ui.page_title));
    html.push_str(HEAD_ASSETS);
    html.push_str(DASHBOARD_STYLES);
    if with_stylesheet && let Some(web) = mount_prefix(config, MountTarget::Web) {
        let _ = writeln!(
            html,
            "    <link rel=\"stylesheet\" href=\"{}/{}\"/>",
            escape_html(web),
            dengue_map_config::paths::STYLE_CSS
        );
    }
    html.push_str("</head>\n<body>\n");

    let _ = write!(
        html,
        r#"    <div id="header" style="position: absolute; top: 10px; left: 10px; z-index: 1000; background: rgba(255, 255, 255, 0.9); padding: 15px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.3);">
        <h2 style="margin: 0; font-size: 24px; color: {title_color}; font-weight: bold;">{title}</h2>
    </div>

    <div id="sidebar" style="position: absolute; left: 10px; top: 80px; bottom: 10px; width: 300px; background: rgba(255, 255, 255, 0.98); padding: 20px; box-shadow: 0 4px 20px rgba(0,0,0,0.15); overflow-y: auto; border-radius: 12px; z-index: 1000;">
        <h3 class="sidebar-title" style="font-size: 20px;">
            <i class="{icon}" style="margin-right: 8px;"></i>
            {sidebar_title}
        </h3>
        <div id="district-list" style="font-size: 14px;"></div>
    </div>

    <div id="info-panel" style="position: absolute; top: 10px; right: 10px; width: 300px; background: rgba(255, 255, 255, 0.95); padding: 15px; box-shadow: 0 2px 10px rgba(0,0,0,0.3); border-radius: 8px; z-index: 1000; display: none;">
        <div style="display: flex; justify-content: space-between; align-items: center; margin-bottom: 10px;">
            <h4 id="district-title" style="margin: 0; color: {title_color};"></h4>
            <button id="close-panel" style="background: none; border: none; font-size: 20px; color: #999; cursor: pointer;">&times;</button>
        </div>
        <div id="district-info" style="font-size: 14px;">
            <p><strong>{population}:</strong> <span id="population">-</span></p>
            <p><strong>{cases}:</strong> <span id="dengue-cases">-</span></p>
            <p><strong>{rate}:</strong> <span id="rate-per-10k">-</span></p>
            <p><strong>{risk}:</strong> <span id="risk-level">-</span></p>
            <p><strong>{updated}:</strong> <span id="last-update">-</span></p>
            <p id="detail-data" style="margin-top: 10px; border-top: 1px solid #e0e0e0; padding-top: 10px;"></p>
        </div>
    </div>

    <div class="folium-map" id="map" style="position: absolute; top: 0; left: 320px; right: 0; bottom: 0;"></div>
"#,
        title_color = escape_html(&config.style.default.color),
        title = escape_html(&ui.page_title),
        icon = escape_html(&ui.sidebar_icon),
        sidebar_title = escape_html(&ui.sidebar_title),
        population = escape_html(&ui.population_label),
        cases = escape_html(&ui.dengue_cases_label),
        rate = escape_html(&ui.rate_per_10k_label),
        risk = escape_html(&ui.risk_level_label),
        updated = escape_html(&ui.last_update_label),
    );

    let _ = writeln!(
        html,
        "    <script src=\"{}/{}\"></script>",
        escape_html(template_prefix),
        dengue_map_config::paths::SCRIPT_JS
    );
    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_page_has_one_inline_script() {
        let page = render_map_page(&Config::default(), "var a = 1;");
        assert_eq!(page.matches("<script>").count(), 1);
        assert_eq!(extract_inline_script(&page), Some("var a = 1;"));
        assert!(page.contains("id=\"map\""));
    }

    #[test]
    fn shell_contains_placeholders_and_script_tag() {
        let shell = render_shell(&Config::default(), false);
        for id in [
            "district-list",
            "info-panel",
            "population",
            "dengue-cases",
            "rate-per-10k",
            "risk-level",
            "last-update",
            "detail-data",
            "close-panel",
        ] {
            assert!(shell.contains(&format!("id=\"{id}\"")), "missing #{id}");
        }
        assert!(shell.contains("<script src=\"/template/script.js\"></script>"));
        assert!(shell.contains("台南市登革熱疫情資料"));
        assert!(!shell.contains("<script>"));
        assert!(!shell.contains("style.css"));
    }

    #[test]
    fn shell_links_stylesheet_from_web_mount() {
        let shell = render_shell(&Config::default(), true);
        assert!(shell.contains("href=\"/Home/style.css\""));
    }

    #[test]
    fn shell_escapes_text() {
        let mut config = Config::default();
        config.ui.page_title = "<Dengue & Co>".to_string();
        let shell = render_shell(&config, false);
        assert!(shell.contains("&lt;Dengue &amp; Co&gt;"));
    }
}
