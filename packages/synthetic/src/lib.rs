#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Synthetic dengue data for Tainan's 37 districts.
//!
//! Produces plausible district case counts, a weather observation and
//! ovitrap readings so the dashboard can run without the open-data feed.
//! The generator is generic over [`rand::Rng`]; seed a
//! [`rand::rngs::StdRng`] for reproducible output.

pub mod snapshot;

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use dengue_map_config::Config;
use dengue_map_dengue_models::{
    DengueSnapshot, DistrictRecord, OvitrapRecord, RiskThresholds, TrapLocation, TrapStatus,
    WeatherRecord, sort_by_cases_desc,
};
use rand::Rng;
use thiserror::Error;

/// Errors that can occur while writing synthetic snapshots.
#[derive(Debug, Error)]
pub enum SyntheticError {
    /// A snapshot file could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyntheticError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Tainan districts and their approximate populations.
pub const DISTRICTS: &[(&str, u32)] = &[
    ("中西區", 78_000),
    ("安平區", 65_000),
    ("東區", 185_000),
    ("南區", 125_000),
    ("北區", 135_000),
    ("安南區", 195_000),
    ("永康區", 235_000),
    ("歸仁區", 68_000),
    ("新化區", 45_000),
    ("左鎮區", 5_000),
    ("玉井區", 15_000),
    ("南化區", 9_000),
    ("楠西區", 11_000),
    ("善化區", 48_000),
    ("大內區", 10_000),
    ("山上區", 8_000),
    ("新市區", 36_000),
    ("安定區", 31_000),
    ("關廟區", 35_000),
    ("龍崎區", 4_000),
    ("仁德區", 75_000),
    ("七股區", 23_000),
    ("佳里區", 60_000),
    ("學甲區", 28_000),
    ("西港區", 25_000),
    ("將軍區", 20_000),
    ("北門區", 12_000),
    ("新營區", 78_000),
    ("鹽水區", 28_000),
    ("白河區", 30_000),
    ("後壁區", 25_000),
    ("東山區", 22_000),
    ("六甲區", 23_000),
    ("官田區", 22_000),
    ("麻豆區", 45_000),
    ("下營區", 25_000),
    ("柳營區", 22_000),
];

/// Population assumed for a district missing from [`DISTRICTS`].
pub const DEFAULT_POPULATION: u32 = 50_000;

const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";
const SECOND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Base population of a district by name.
#[must_use]
pub fn base_population(district: &str) -> u32 {
    DISTRICTS
        .iter()
        .find(|(name, _)| *name == district)
        .map_or(DEFAULT_POPULATION, |&(_, population)| population)
}

/// Upper bound (inclusive) of random cases for a district population.
#[must_use]
pub const fn max_cases(population: u32) -> u32 {
    if population > 100_000 {
        50
    } else if population > 50_000 {
        30
    } else {
        20
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Random snapshot generator.
pub struct SyntheticGenerator<R: Rng> {
    rng: R,
    thresholds: RiskThresholds,
}

impl<R: Rng> SyntheticGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            thresholds: RiskThresholds::default(),
        }
    }

    /// Classifies generated districts with `thresholds` instead of the
    /// defaults.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    fn days_before(&mut self, now: NaiveDateTime, max_days: i64) -> NaiveDateTime {
        now - Duration::days(self.rng.gen_range(0..=max_days))
    }

    /// One record per district, sorted by case count, highest first.
    /// Ids follow the order of [`DISTRICTS`], starting at 1.
    pub fn districts(&mut self, now: NaiveDateTime) -> Vec<DistrictRecord> {
        let mut records: Vec<DistrictRecord> = DISTRICTS
            .iter()
            .enumerate()
            .map(|(index, &(name, _))| {
                let population = base_population(name);
                let cases = self.rng.gen_range(0..=max_cases(population));
                let updated = self.days_before(now, 7);
                #[allow(clippy::cast_possible_truncation)]
                let id = index as u32 + 1;

                DistrictRecord::with_thresholds(
                    id,
                    name,
                    population,
                    cases,
                    updated.format(MINUTE_FORMAT).to_string(),
                    &self.thresholds,
                )
            })
            .collect();

        sort_by_cases_desc(&mut records);
        records
    }

    pub fn weather(&mut self, now: NaiveDateTime) -> WeatherRecord {
        WeatherRecord {
            temperature: round_to(self.rng.gen_range(25.0..=35.0), 1),
            humidity: self.rng.gen_range(60..=90),
            rainfall: round_to(self.rng.gen_range(0.0..=50.0), 1),
            update_time: now.format(MINUTE_FORMAT).to_string(),
        }
    }

    /// 5 to 15 traps per district, scattered around central Tainan.
    pub fn ovitraps(&mut self, now: NaiveDateTime) -> Vec<OvitrapRecord> {
        let mut traps = Vec::new();

        for &(district, _) in DISTRICTS {
            let count = self.rng.gen_range(5..=15);
            for n in 1..=count {
                let statuses = TrapStatus::all();
                let status = statuses[self.rng.gen_range(0..statuses.len())];
                let checked = self.days_before(now, 14);

                traps.push(OvitrapRecord {
                    district: district.to_string(),
                    ovitrap_id: format!("{district}_{n:03}"),
                    egg_count: self.rng.gen_range(0..=200),
                    location: TrapLocation {
                        lat: round_to(23.0 + self.rng.gen_range(-0.5..=0.5), 6),
                        lng: round_to(120.2 + self.rng.gen_range(-0.5..=0.5), 6),
                    },
                    status,
                    last_check: checked.format(DATE_FORMAT).to_string(),
                });
            }
        }

        traps
    }

    /// Generates a complete snapshot as of `now`.
    pub fn generate(&mut self, now: NaiveDateTime) -> DengueSnapshot {
        let districts = self.districts(now);
        let weather = self.weather(now);
        let ovitraps = self.ovitraps(now);

        DengueSnapshot::new(
            districts,
            weather,
            ovitraps,
            now.format(SECOND_FORMAT).to_string(),
        )
    }
}

/// Writes the district, weather, ovitrap and combined snapshot files into
/// the configured data directory. Returns the written paths in that order.
///
/// # Errors
///
/// Returns [`SyntheticError`] if any file cannot be written.
pub fn write_all(snapshot: &DengueSnapshot, config: &Config) -> Result<Vec<PathBuf>, SyntheticError> {
    let paths = &config.paths;
    let district_path = paths.district_data_json();
    let weather_path = paths.weather_data_json();
    let ovitrap_path = paths.ovitrap_data_json();
    let combined_path = paths.dengue_data_json();

    snapshot::write_json(&snapshot.districts, &district_path)?;
    snapshot::write_json(&snapshot.weather, &weather_path)?;
    snapshot::write_json(&snapshot.ovitraps, &ovitrap_path)?;
    snapshot::write_json(snapshot, &combined_path)?;

    Ok(vec![district_path, weather_path, ovitrap_path, combined_path])
}
