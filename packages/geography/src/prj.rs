//! CRS detection from ESRI `.prj` WKT.

use dengue_map_geography_models::Crs;

/// Well-known WKT names, checked in order after `AUTHORITY` lookup fails.
const KNOWN_NAMES: &[(&str, u32)] = &[
    ("TWD_1997_TM_TAIWAN", 3826),
    ("TWD97_TM2_ZONE_121", 3826),
    ("TM2_ZONE_121", 3826),
    ("TWD_1997_TM_PENGHU", 3825),
    ("TWD97_TM2_ZONE_119", 3825),
    ("TM2_ZONE_119", 3825),
    ("WGS_1984_WEB_MERCATOR", 3857),
    ("PSEUDO-MERCATOR", 3857),
    ("GCS_TWD_1997", 3824),
    ("GCS_WGS_1984", 4326),
    ("WGS 84", 4326),
];

/// Detects the coordinate system described by `.prj` WKT text.
///
/// Only an `AUTHORITY["EPSG","n"]` that belongs to the root node counts;
/// codes on nested nodes (the `GEOGCS` of a `PROJCS`, datums, spheroids)
/// describe something else. Without one, well-known ESRI and OGC names are
/// matched. Returns `None` for anything else.
#[must_use]
pub fn detect_crs(wkt: &str) -> Option<Crs> {
    if let Some(code) = root_epsg_authority(wkt) {
        return Some(Crs::Epsg(code));
    }

    let normalized = wkt.to_ascii_uppercase().replace(' ', "_");
    KNOWN_NAMES
        .iter()
        .find(|(name, _)| normalized.contains(&name.replace(' ', "_")))
        .map(|&(_, code)| Crs::Epsg(code))
}

/// EPSG code of an `AUTHORITY` node that is a direct child of the root.
fn root_epsg_authority(wkt: &str) -> Option<u32> {
    const KEYWORD: &str = "AUTHORITY";

    let upper = wkt.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let mut depth = 0_usize;
    let mut in_quote = false;
    let mut last_token = 0_u8;

    for (i, &b) in bytes.iter().enumerate() {
        if b == b'"' {
            in_quote = !in_quote;
            continue;
        }
        if in_quote {
            continue;
        }
        match b {
            b'[' | b'(' => depth += 1,
            b']' | b')' => depth = depth.saturating_sub(1),
            b'A' if depth == 1 && last_token == b',' && upper[i..].starts_with(KEYWORD) => {
                if let Some(code) = epsg_args(&upper[i + KEYWORD.len()..]) {
                    return Some(code);
                }
            }
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            last_token = b;
        }
    }
    None
}

/// Parses `["EPSG","n"]` at the start of `rest`.
fn epsg_args(rest: &str) -> Option<u32> {
    let rest = rest.trim_start().strip_prefix(['[', '('])?;
    let args = &rest[..rest.find([']', ')'])?];

    let mut parts = args.split(',').map(|p| p.trim().trim_matches('"'));
    if parts.next()? != "EPSG" {
        return None;
    }
    parts.next()?.parse().ok()
}
