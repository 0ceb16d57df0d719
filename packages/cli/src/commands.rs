//! Subcommand implementations.

use std::path::Path;

use dengue_map_cli_utils::{IndicatifProgress, MultiProgress};
use dengue_map_config::Config;
use dengue_map_generate::{ComposeOptions, ScriptOutcome, ScriptPolicy, regenerate};
use dengue_map_geography::{ConvertOptions, convert as convert_boundaries};
use dengue_map_geography_models::Crs;
use dengue_map_scraper::{WebDriverBrowser, purge_data_dir, refresh_all, refresh_direct};
use dengue_map_synthetic::{SyntheticGenerator, write_all};
use rand::SeedableRng as _;
use rand::rngs::StdRng;

/// Districts listed in the `generate-data` summary.
const TOP_DISTRICTS: usize = 5;

const BANNER: &str = "==================================================";

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| allowed.iter().any(|a| e.eq_ignore_ascii_case(a)))
}

pub fn convert(
    config: &Config,
    input: &Path,
    output: &Path,
    input_crs: Option<Crs>,
    output_crs: Option<Crs>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !has_extension(input, &["shp", "shx", "geojson", "json"]) {
        log::warn!("{} does not look like a shapefile or GeoJSON", input.display());
    }
    if !has_extension(output, &["geojson", "json"]) {
        log::warn!("{} does not have a .geojson extension", output.display());
    }

    let defaults = ConvertOptions::from(&config.crs);
    let options = ConvertOptions {
        input_crs: input_crs.unwrap_or(defaults.input_crs),
        output_crs: output_crs.unwrap_or(defaults.output_crs),
    };

    println!("{BANNER}");
    println!("Converting {} -> {}", input.display(), output.display());
    println!("{BANNER}");

    match convert_boundaries(input, output, &options) {
        Ok(report) => {
            println!("Conversion succeeded");
            println!("  features: {}", report.feature_count);
            println!("  crs:      {}", report.crs);
            if let Some(bbox) = report.bounding_box {
                println!("  bounds:   {bbox}");
            }
            if let Some(center) = report.center {
                println!("  center:   {center}");
            }
            println!("  size:     {} bytes", report.bytes_written);
            println!("{BANNER}");
            Ok(())
        }
        Err(e) => {
            println!("Conversion failed: {e}");
            println!("{BANNER}");
            Err(e.into())
        }
    }
}

pub fn compose(config: &Config, force_script: bool) -> Result<(), Box<dyn std::error::Error>> {
    let options = ComposeOptions {
        script_policy: if force_script {
            ScriptPolicy::Overwrite
        } else {
            ScriptPolicy::PreserveExisting
        },
    };

    let report = regenerate(config, &options)?;

    println!(
        "Composed map with {} districts centered at {}",
        report.feature_count, report.center
    );
    match report.script {
        ScriptOutcome::Created => println!("Created {}", config.paths.script_js().display()),
        ScriptOutcome::Preserved => println!(
            "Kept existing {} (use --force-script to rewrite)",
            config.paths.script_js().display()
        ),
        ScriptOutcome::Overwritten => {
            println!("Rewrote {}", config.paths.script_js().display());
        }
    }
    println!("Page: {}", config.paths.map_html().display());
    Ok(())
}

pub fn generate_data(config: &Config, seed: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let snapshot = SyntheticGenerator::new(rng)
        .with_thresholds(config.risk.thresholds)
        .generate(chrono::Local::now().naive_local());

    let written = write_all(&snapshot, config)?;

    println!("Generated data for {} districts", snapshot.total_districts);
    println!("  total cases:         {}", snapshot.total_cases);
    println!("  high-risk districts: {}", snapshot.high_risk_districts);
    println!("  ovitraps:            {}", snapshot.ovitraps.len());
    println!(
        "  weather:             {}°C / {}% / {} mm",
        snapshot.weather.temperature, snapshot.weather.humidity, snapshot.weather.rainfall
    );
    println!("Top {TOP_DISTRICTS} districts:");
    for (rank, district) in snapshot.districts.iter().take(TOP_DISTRICTS).enumerate() {
        println!(
            "  {}. {} - {} cases ({:.2}/10k, {})",
            rank + 1,
            district.name(),
            district.dengue_cases(),
            district.rate_per_10k(),
            district.risk_level()
        );
    }
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

pub async fn refresh(
    config: &Config,
    multi: &MultiProgress,
    direct: bool,
    purge: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if purge {
        purge_data_dir(&config.paths.data_dir())?;
    }

    let http = reqwest::Client::builder().build()?;

    if direct {
        let path = config.paths.bucket_json();
        let bytes = refresh_direct(&http, &config.refresh.direct_url, &path).await?;
        println!("Data updated: {} ({bytes} bytes)", path.display());
        return Ok(());
    }

    let browser = WebDriverBrowser::connect(&config.refresh).await?;
    let progress = IndicatifProgress::steps_bar(multi, "Refreshing datasets");
    let written = refresh_all(&browser, &http, config, progress.as_ref()).await?;

    for path in &written {
        println!("Data updated: {}", path.display());
    }
    Ok(())
}

pub fn validate(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let issues = config.issues();
    if issues.is_empty() {
        println!("Config OK");
        return Ok(());
    }

    for issue in &issues {
        println!("  {issue}");
    }
    Err(format!("{} config issue(s)", issues.len()).into())
}
