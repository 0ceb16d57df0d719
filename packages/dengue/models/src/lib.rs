#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! District case, risk, weather and ovitrap types for the dengue map.
//!
//! These are the records persisted in the JSON snapshot files under
//! `data/` and consumed by the map sidebar. The rate per 10k residents and
//! the snapshot counters are always computed from the case counts and
//! populations, never stored independently of them.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Risk category for a district, derived from its case rate per 10,000
/// residents.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum RiskLevel {
    /// Fewer than 2 cases per 10k residents
    #[serde(rename = "低風險")]
    #[strum(serialize = "低風險")]
    Low,
    /// 2 to 5 cases per 10k residents
    #[serde(rename = "中風險")]
    #[strum(serialize = "中風險")]
    Medium,
    /// 5 to 10 cases per 10k residents
    #[serde(rename = "高風險")]
    #[strum(serialize = "高風險")]
    High,
    /// 10 or more cases per 10k residents
    #[serde(rename = "極高風險")]
    #[strum(serialize = "極高風險")]
    Extreme,
}

impl RiskLevel {
    /// Classifies a rate per 10k residents against the given thresholds.
    ///
    /// A `NaN` rate classifies as [`RiskLevel::Low`].
    #[must_use]
    pub fn classify(rate_per_10k: f64, thresholds: &RiskThresholds) -> Self {
        if rate_per_10k >= thresholds.extreme {
            Self::Extreme
        } else if rate_per_10k >= thresholds.high {
            Self::High
        } else if rate_per_10k >= thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Classifies a rate using [`RiskThresholds::default`].
    #[must_use]
    pub fn from_rate(rate_per_10k: f64) -> Self {
        Self::classify(rate_per_10k, &RiskThresholds::default())
    }

    /// Whether this level counts towards the "high risk districts" total.
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High | Self::Extreme)
    }

    /// Returns all variants in ascending order of severity.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::Extreme]
    }
}

/// Lower bounds (inclusive) of each risk tier above [`RiskLevel::Low`],
/// in cases per 10k residents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Lower bound of [`RiskLevel::Medium`].
    pub medium: f64,
    /// Lower bound of [`RiskLevel::High`].
    pub high: f64,
    /// Lower bound of [`RiskLevel::Extreme`].
    pub extreme: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 2.0,
            high: 5.0,
            extreme: 10.0,
        }
    }
}

impl RiskThresholds {
    /// Whether the thresholds are positive and strictly increasing.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.medium > 0.0 && self.medium < self.high && self.high < self.extreme
    }
}

/// Cases per 10,000 residents, rounded to two decimals.
///
/// A population of zero yields `0.0`.
#[must_use]
pub fn rate_per_10k(cases: u32, population: u32) -> f64 {
    (exact_rate(cases, population) * 100.0).round() / 100.0
}

/// Unrounded rate; risk is classified from this, not the displayed value.
fn exact_rate(cases: u32, population: u32) -> f64 {
    if population == 0 {
        return 0.0;
    }
    f64::from(cases) / f64::from(population) * 10_000.0
}

/// Per-district dengue statistics.
///
/// Construct with [`DistrictRecord::new`]. The rate and sidebar value are
/// recomputed on deserialization, so a snapshot file cannot carry a rate
/// that disagrees with its case count. A stored risk level is kept when
/// some ordered thresholds could have produced it; otherwise the record is
/// classified with [`RiskThresholds::default`]. Use
/// [`DistrictRecord::reclassify`] to apply known thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DistrictRecordWire", into = "DistrictRecordWire")]
pub struct DistrictRecord {
    id: u32,
    name: String,
    population: u32,
    dengue_cases: u32,
    last_update: String,
    rate_per_10k: f64,
    risk_level: RiskLevel,
}

impl DistrictRecord {
    /// Creates a record, classifying risk with the default thresholds.
    #[must_use]
    pub fn new(
        id: u32,
        name: impl Into<String>,
        population: u32,
        dengue_cases: u32,
        last_update: impl Into<String>,
    ) -> Self {
        Self::with_thresholds(
            id,
            name,
            population,
            dengue_cases,
            last_update,
            &RiskThresholds::default(),
        )
    }

    /// Creates a record, classifying risk with custom thresholds.
    #[must_use]
    pub fn with_thresholds(
        id: u32,
        name: impl Into<String>,
        population: u32,
        dengue_cases: u32,
        last_update: impl Into<String>,
        thresholds: &RiskThresholds,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            population,
            dengue_cases,
            last_update: last_update.into(),
            rate_per_10k: rate_per_10k(dengue_cases, population),
            risk_level: RiskLevel::classify(exact_rate(dengue_cases, population), thresholds),
        }
    }

    /// Re-derives the risk level from the case rate and `thresholds`.
    pub fn reclassify(&mut self, thresholds: &RiskThresholds) {
        self.risk_level =
            RiskLevel::classify(exact_rate(self.dengue_cases, self.population), thresholds);
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn population(&self) -> u32 {
        self.population
    }

    #[must_use]
    pub const fn dengue_cases(&self) -> u32 {
        self.dengue_cases
    }

    #[must_use]
    pub fn last_update(&self) -> &str {
        &self.last_update
    }

    #[must_use]
    pub const fn rate_per_10k(&self) -> f64 {
        self.rate_per_10k
    }

    #[must_use]
    pub const fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }
}

/// On-disk shape of a [`DistrictRecord`]. Derived fields are written for
/// the sidebar but ignored when reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DistrictRecordWire {
    id: u32,
    name: String,
    population: u32,
    dengue_cases: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    risk_level: Option<RiskLevel>,
    last_update: String,
    #[serde(default)]
    value: u32,
    #[serde(default)]
    rate_per_10k: f64,
}

impl From<DistrictRecordWire> for DistrictRecord {
    fn from(wire: DistrictRecordWire) -> Self {
        let mut record = Self::new(
            wire.id,
            wire.name,
            wire.population,
            wire.dengue_cases,
            wire.last_update,
        );
        // With positive thresholds a zero rate can only be Low; any positive
        // rate can land in any tier.
        let zero_rate = exact_rate(record.dengue_cases, record.population) <= 0.0;
        match wire.risk_level {
            Some(level) if level == RiskLevel::Low || !zero_rate => record.risk_level = level,
            _ => {}
        }
        record
    }
}

impl From<DistrictRecord> for DistrictRecordWire {
    fn from(record: DistrictRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            population: record.population,
            dengue_cases: record.dengue_cases,
            risk_level: Some(record.risk_level),
            last_update: record.last_update,
            value: record.dengue_cases,
            rate_per_10k: record.rate_per_10k,
        }
    }
}

/// Sorts districts by case count, highest first. Ties keep their order.
pub fn sort_by_cases_desc(districts: &mut [DistrictRecord]) {
    districts.sort_by(|a, b| b.dengue_cases.cmp(&a.dengue_cases));
}

/// City-wide weather observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Air temperature in °C.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: u8,
    /// Rainfall in mm.
    pub rainfall: f64,
    /// Observation time (`%Y-%m-%d %H:%M`).
    pub update_time: String,
}

/// Maintenance state of an ovitrap.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum TrapStatus {
    #[serde(rename = "正常")]
    #[strum(serialize = "正常")]
    Normal,
    #[serde(rename = "需更換")]
    #[strum(serialize = "需更換")]
    NeedsReplacement,
    #[serde(rename = "故障")]
    #[strum(serialize = "故障")]
    Broken,
}

impl TrapStatus {
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Normal, Self::NeedsReplacement, Self::Broken]
    }
}

/// A WGS84 point in the snapshot's `{ "lat", "lng" }` shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrapLocation {
    pub lat: f64,
    pub lng: f64,
}

/// A single egg-collection trap.
///
/// `district` refers to a [`DistrictRecord`] by name only; no ownership
/// or population relationship is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvitrapRecord {
    pub district: String,
    /// `{district}_{n:03}`
    pub ovitrap_id: String,
    pub egg_count: u32,
    pub location: TrapLocation,
    pub status: TrapStatus,
    /// Date of the last inspection (`%Y-%m-%d`).
    pub last_check: String,
}

/// Combined dashboard document (`dengue_data.json`).
///
/// The counters are written for the sidebar and recomputed from the
/// districts when reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DengueSnapshotWire")]
pub struct DengueSnapshot {
    pub districts: Vec<DistrictRecord>,
    pub weather: WeatherRecord,
    pub ovitraps: Vec<OvitrapRecord>,
    /// `%Y-%m-%d %H:%M:%S`
    pub generated_at: String,
    pub total_districts: usize,
    pub total_cases: u64,
    pub high_risk_districts: usize,
}

impl DengueSnapshot {
    /// Builds a snapshot and its aggregate counters.
    #[must_use]
    pub fn new(
        districts: Vec<DistrictRecord>,
        weather: WeatherRecord,
        ovitraps: Vec<OvitrapRecord>,
        generated_at: impl Into<String>,
    ) -> Self {
        let total_cases = districts
            .iter()
            .map(|d| u64::from(d.dengue_cases()))
            .sum();
        let high_risk_districts = districts
            .iter()
            .filter(|d| d.risk_level().is_high())
            .count();

        Self {
            total_districts: districts.len(),
            total_cases,
            high_risk_districts,
            districts,
            weather,
            ovitraps,
            generated_at: generated_at.into(),
        }
    }

    /// Re-derives every district's risk level from `thresholds` and
    /// refreshes the high-risk counter.
    pub fn reclassify(&mut self, thresholds: &RiskThresholds) {
        for district in &mut self.districts {
            district.reclassify(thresholds);
        }
        self.high_risk_districts = self
            .districts
            .iter()
            .filter(|d| d.risk_level().is_high())
            .count();
    }
}

#[derive(Deserialize)]
struct DengueSnapshotWire {
    districts: Vec<DistrictRecord>,
    weather: WeatherRecord,
    ovitraps: Vec<OvitrapRecord>,
    generated_at: String,
}

impl From<DengueSnapshotWire> for DengueSnapshot {
    fn from(wire: DengueSnapshotWire) -> Self {
        Self::new(wire.districts, wire.weather, wire.ovitraps, wire.generated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anping_scenario_is_medium() {
        let record = DistrictRecord::new(2, "安平區", 65_000, 13, "2025-07-01 10:00");
        assert!((record.rate_per_10k() - 2.0).abs() < f64::EPSILON);
        assert_eq!(record.risk_level(), RiskLevel::Medium);
        assert_eq!(record.risk_level().to_string(), "中風險");
    }

    #[test]
    fn zero_population_is_low_risk() {
        assert!(rate_per_10k(25, 0).abs() < f64::EPSILON);
        let record = DistrictRecord::new(1, "空區", 0, 25, "2025-07-01 10:00");
        assert_eq!(record.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn rate_is_rounded_to_two_decimals() {
        // 7 / 30000 * 10000 = 2.3333...
        assert!((rate_per_10k(7, 30_000) - 2.33).abs() < 1e-9);
        assert!((rate_per_10k(0, 30_000)).abs() < f64::EPSILON);
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(RiskLevel::from_rate(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_rate(1.99), RiskLevel::Low);
        assert_eq!(RiskLevel::from_rate(2.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_rate(4.99), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_rate(5.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_rate(9.99), RiskLevel::High);
        assert_eq!(RiskLevel::from_rate(10.0), RiskLevel::Extreme);
        assert_eq!(RiskLevel::from_rate(f64::NAN), RiskLevel::Low);
    }

    #[test]
    fn classification_is_monotonic() {
        let mut previous = RiskLevel::Low;
        for step in 0..=2_000 {
            let rate = f64::from(step) / 100.0;
            let level = RiskLevel::from_rate(rate);
            assert!(level >= previous, "{rate} classified below {previous:?}");
            previous = level;
        }
        assert_eq!(previous, RiskLevel::Extreme);
    }

    #[test]
    fn risk_level_parses_from_label() {
        for level in RiskLevel::all() {
            let parsed: RiskLevel = level.to_string().parse().unwrap();
            assert_eq!(parsed, *level);
        }
    }

    #[test]
    fn deserialization_recomputes_rate_and_keeps_stored_level() {
        let json = r#"{
            "id": 3,
            "name": "東區",
            "population": 185000,
            "dengue_cases": 200,
            "risk_level": "高風險",
            "last_update": "2025-07-01 10:00",
            "value": 1,
            "rate_per_10k": 0.01
        }"#;
        let record: DistrictRecord = serde_json::from_str(json).unwrap();
        assert!((record.rate_per_10k() - 10.81).abs() < 1e-9);
        assert_eq!(record.risk_level(), RiskLevel::High);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["value"], 200);
        assert_eq!(value["risk_level"], "高風險");
    }

    #[test]
    fn missing_or_impossible_level_uses_default_thresholds() {
        let missing = r#"{"id": 1, "name": "東區", "population": 185000,
            "dengue_cases": 200, "last_update": "t"}"#;
        let record: DistrictRecord = serde_json::from_str(missing).unwrap();
        assert_eq!(record.risk_level(), RiskLevel::Extreme);

        let zero_cases = r#"{"id": 1, "name": "東區", "population": 185000,
            "dengue_cases": 0, "risk_level": "極高風險", "last_update": "t"}"#;
        let record: DistrictRecord = serde_json::from_str(zero_cases).unwrap();
        assert_eq!(record.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn risk_uses_unrounded_rate() {
        // 10 / 50100 * 10000 = 1.996..., shown as 2.0
        let record = DistrictRecord::new(1, "北區", 50_100, 10, "t");
        assert!((record.rate_per_10k() - 2.0).abs() < f64::EPSILON);
        assert_eq!(record.risk_level(), RiskLevel::Low);
    }

    fn weather() -> WeatherRecord {
        WeatherRecord {
            temperature: 30.1,
            humidity: 70,
            rainfall: 3.2,
            update_time: "t".to_string(),
        }
    }

    #[test]
    fn snapshot_with_custom_thresholds_reads_back_equal() {
        let thresholds = RiskThresholds {
            medium: 1.0,
            high: 2.0,
            extreme: 3.0,
        };
        let districts = vec![
            DistrictRecord::with_thresholds(1, "永康區", 10_000, 2, "t", &thresholds),
            DistrictRecord::with_thresholds(2, "南區", 10_000, 4, "t", &thresholds),
            DistrictRecord::with_thresholds(3, "東區", 10_000, 0, "t", &thresholds),
        ];
        let snapshot = DengueSnapshot::new(districts, weather(), Vec::new(), "t");
        assert_eq!(snapshot.high_risk_districts, 2);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: DengueSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(back, snapshot);
        assert_eq!(back.districts[0].risk_level(), RiskLevel::High);
    }

    #[test]
    fn snapshot_counters_are_recomputed_on_read() {
        let snapshot = DengueSnapshot::new(
            vec![DistrictRecord::new(1, "北區", 10_000, 12, "t")],
            weather(),
            Vec::new(),
            "t",
        );
        let mut value = serde_json::to_value(&snapshot).unwrap();
        value["total_districts"] = 99.into();
        value["total_cases"] = 5_000.into();
        value["high_risk_districts"] = 42.into();

        let back: DengueSnapshot = serde_json::from_value(value).unwrap();

        assert_eq!(back.total_districts, 1);
        assert_eq!(back.total_cases, 12);
        assert_eq!(back.high_risk_districts, 1);
    }

    #[test]
    fn reclassify_applies_thresholds_and_counter() {
        let mut snapshot = DengueSnapshot::new(
            vec![
                DistrictRecord::new(1, "北區", 10_000, 3, "t"),
                DistrictRecord::new(2, "南區", 10_000, 1, "t"),
            ],
            weather(),
            Vec::new(),
            "t",
        );
        assert_eq!(snapshot.high_risk_districts, 0);

        snapshot.reclassify(&RiskThresholds {
            medium: 0.5,
            high: 1.0,
            extreme: 3.0,
        });

        assert_eq!(snapshot.districts[0].risk_level(), RiskLevel::Extreme);
        assert_eq!(snapshot.districts[1].risk_level(), RiskLevel::High);
        assert_eq!(snapshot.high_risk_districts, 2);
    }

    #[test]
    fn snapshot_counts_cases_and_high_risk() {
        let districts = vec![
            DistrictRecord::new(1, "北區", 10_000, 12, "t"),
            DistrictRecord::new(2, "南區", 10_000, 6, "t"),
            DistrictRecord::new(3, "東區", 10_000, 1, "t"),
        ];
        let snapshot = DengueSnapshot::new(districts, weather(), Vec::new(), "t");
        assert_eq!(snapshot.total_districts, 3);
        assert_eq!(snapshot.total_cases, 19);
        assert_eq!(snapshot.high_risk_districts, 2);
    }

    #[test]
    fn sort_puts_highest_case_count_first() {
        let mut districts = vec![
            DistrictRecord::new(1, "a", 1_000, 3, "t"),
            DistrictRecord::new(2, "b", 1_000, 9, "t"),
            DistrictRecord::new(3, "c", 1_000, 0, "t"),
        ];
        sort_by_cases_desc(&mut districts);
        let cases: Vec<u32> = districts.iter().map(DistrictRecord::dengue_cases).collect();
        assert_eq!(cases, vec![9, 3, 0]);
    }

    #[test]
    fn thresholds_ordering() {
        assert!(RiskThresholds::default().is_ordered());
        let bad = RiskThresholds {
            medium: 5.0,
            high: 5.0,
            extreme: 10.0,
        };
        assert!(!bad.is_ordered());
    }
}
