//! Derived humidity metrics.
//!
//! [`compute_snapshot`] turns an unordered list of stored readings into the
//! values the dashboard shows: the newest readings per location, a rolling
//! average over the newest valid readings, and the labels derived from that
//! average. The function is pure. It performs no I/O, keeps no state between
//! calls and never mutates its input.
//!
//! Missing data is not an error here. When the averaging window cannot be
//! filled the average and every label are [`Metric::Unavailable`], so a
//! partial window never produces a misleading number.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::models::Reading;

// ---

/// Labels bucketed by default.
pub const DEFAULT_LOCATIONS: [&str; 2] = ["ubicacion 1", "ubicacion 2"];

/// Serialized form of an absent metric.
pub const UNAVAILABLE: &str = "unavailable";

/// A derived value that may be absent because there was not enough data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric<T> {
    Available(T),
    Unavailable,
}

impl<T> Metric<T> {
    // ---
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metric<U> {
        match self {
            Metric::Available(v) => Metric::Available(f(v)),
            Metric::Unavailable => Metric::Unavailable,
        }
    }
}

impl<T: Serialize> Serialize for Metric<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Available(v) => v.serialize(serializer),
            Metric::Unavailable => serializer.serialize_str(UNAVAILABLE),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Metric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Available(v) => v.fmt(f),
            Metric::Unavailable => f.write_str(UNAVAILABLE),
        }
    }
}

/// Field quality band for a rolling average.
///
/// Bands are ordered from best to worst. Each upper bound is inclusive:
/// `<= 20` Buena, `<= 40` Normal, `<= 60` Mala, above that Pésima.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum QualityBand {
    #[serde(rename = "Buena")]
    Good,
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Mala")]
    Poor,
    #[serde(rename = "Pésima")]
    Terrible,
}

impl QualityBand {
    // ---
    pub fn classify(average: f64) -> Self {
        if average <= 20.0 {
            QualityBand::Good
        } else if average <= 40.0 {
            QualityBand::Normal
        } else if average <= 60.0 {
            QualityBand::Poor
        } else {
            QualityBand::Terrible
        }
    }

    /// Suggested studs for the band. Only the driest band gets firm-ground.
    pub fn footwear(self) -> Footwear {
        match self {
            QualityBand::Good => Footwear::Fg,
            _ => Footwear::Fs,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityBand::Good => "Buena",
            QualityBand::Normal => "Normal",
            QualityBand::Poor => "Mala",
            QualityBand::Terrible => "Pésima",
        }
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QualityBand {
    type Err = String;

    /// Accepts the display labels and their English names, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buena" | "good" => Ok(QualityBand::Good),
            "normal" => Ok(QualityBand::Normal),
            "mala" | "poor" => Ok(QualityBand::Poor),
            "pésima" | "pesima" | "terrible" => Ok(QualityBand::Terrible),
            other => Err(format!("unknown quality band '{other}'")),
        }
    }
}

/// Footwear suggestion derived from the quality band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Footwear {
    #[serde(rename = "FG")]
    Fg,
    #[serde(rename = "FS")]
    Fs,
}

impl fmt::Display for Footwear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Footwear::Fg => "FG",
            Footwear::Fs => "FS",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Playability {
    #[serde(rename = "playable")]
    Playable,
    #[serde(rename = "not playable")]
    NotPlayable,
}

impl fmt::Display for Playability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Playability::Playable => "playable",
            Playability::NotPlayable => "not playable",
        })
    }
}

/// How the playability label is derived from the rolling average.
///
/// Both rules exist in deployed dashboards and disagree for some inputs once
/// the cut-offs are moved, so neither is built in. The integrator picks one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayabilityPolicy {
    /// Not playable when the average is strictly above the threshold.
    Threshold(f64),
    /// Playable while the quality band is no worse than the given band.
    QualityBand(QualityBand),
}

impl PlayabilityPolicy {
    // ---
    pub fn classify(&self, average: f64) -> Playability {
        let playable = match *self {
            PlayabilityPolicy::Threshold(limit) => average <= limit,
            PlayabilityPolicy::QualityBand(worst) => QualityBand::classify(average) <= worst,
        };
        if playable {
            Playability::Playable
        } else {
            Playability::NotPlayable
        }
    }
}

impl Default for PlayabilityPolicy {
    fn default() -> Self {
        PlayabilityPolicy::Threshold(40.0)
    }
}

impl fmt::Display for PlayabilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayabilityPolicy::Threshold(t) => write!(f, "threshold({t})"),
            PlayabilityPolicy::QualityBand(b) => write!(f, "quality_band({b})"),
        }
    }
}

/// Parameters for [`compute_snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    // ---
    /// How many readings to list per location.
    pub recent_count_per_location: usize,

    /// How many valid readings the rolling average needs.
    pub average_window_size: NonZeroUsize,

    /// Locations that get their own listing. Readings from other locations
    /// still count towards the rolling average.
    pub location_labels: Vec<String>,

    pub playability_policy: PlayabilityPolicy,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            recent_count_per_location: 2,
            average_window_size: NonZeroUsize::new(2).unwrap_or(NonZeroUsize::MIN),
            location_labels: DEFAULT_LOCATIONS.iter().map(|s| s.to_string()).collect(),
            playability_policy: PlayabilityPolicy::default(),
        }
    }
}

/// A reading as listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedReading {
    #[serde(flatten)]
    pub reading: Reading,
    pub humidity_display: String,
}

impl From<&Reading> for ListedReading {
    fn from(reading: &Reading) -> Self {
        Self {
            humidity_display: reading.humidity_display(),
            reading: reading.clone(),
        }
    }
}

/// Everything derived from one set of readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    // ---
    /// Newest-first readings for every configured location, empty lists
    /// included.
    pub per_location: BTreeMap<String, Vec<ListedReading>>,
    pub rolling_average: Metric<f64>,
    pub quality_label: Metric<QualityBand>,
    pub footwear_label: Metric<Footwear>,
    pub playability_label: Metric<Playability>,
    pub total_readings: usize,
    pub valid_readings: usize,
}

/// Newest timestamp first. Equal timestamps fall back to the higher id so the
/// result does not depend on the order storage returned the rows in.
fn newest_first(a: &Reading, b: &Reading) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.id.cmp(&a.id))
}

/// Compute the dashboard metrics for `readings`.
pub fn compute_snapshot(readings: &[Reading], config: &MetricsConfig) -> MetricsSnapshot {
    // ---
    let mut ordered: Vec<&Reading> = readings.iter().collect();
    ordered.sort_by(|a, b| newest_first(a, b));

    let per_location = config
        .location_labels
        .iter()
        .map(|label| {
            let recent = ordered
                .iter()
                .filter(|r| r.location == *label)
                .take(config.recent_count_per_location)
                .map(|r| ListedReading::from(*r))
                .collect();
            (label.clone(), recent)
        })
        .collect();

    let valid_readings = ordered.iter().filter(|r| r.valid_humidity().is_some()).count();

    let window_size = config.average_window_size.get();
    let window: Vec<f64> = ordered
        .iter()
        .filter_map(|r| r.valid_humidity())
        .take(window_size)
        .collect();

    // Dividing before summing keeps the mean finite for any finite inputs.
    let rolling_average = if window.len() == window_size {
        let mean: f64 = window.iter().map(|v| v / window_size as f64).sum();
        if mean.is_finite() {
            Metric::Available(mean)
        } else {
            Metric::Unavailable
        }
    } else {
        Metric::Unavailable
    };

    let quality_label = rolling_average.map(QualityBand::classify);
    let policy = config.playability_policy;

    MetricsSnapshot {
        per_location,
        rolling_average,
        quality_label,
        footwear_label: quality_label.map(QualityBand::footwear),
        playability_label: rolling_average.map(|avg| policy.classify(avg)),
        total_readings: readings.len(),
        valid_readings,
    }
}
