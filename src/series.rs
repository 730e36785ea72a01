use crate::error::{WindcastError, WindcastResult};
use crate::metadata::{FeatureValue, SeriesMetadata};
use crate::payload::{classify, ElementKind, PayloadElement, RawValue};
use crate::reader::SeriesReader;
use crate::table::TimeTable;
use crate::time::{infer_resolution, initial_times, Period};
use crate::window::{EnsembleStore, Window, WindowStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// How raw values are normalized at construction time. This is the only
/// eager numeric transform the engine performs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizationFactor {
    /// Store values as supplied.
    Unscaled,
    /// Divide every value by a caller-supplied scalar.
    Value(f64),
    /// Divide every value by the series' own maximum absolute value.
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesKind {
    Deterministic,
    Probabilistic,
    Scenarios,
    SingleTimeSeries,
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesKind::Deterministic => write!(f, "deterministic"),
            SeriesKind::Probabilistic => write!(f, "probabilistic"),
            SeriesKind::Scenarios => write!(f, "scenarios"),
            SeriesKind::SingleTimeSeries => write!(f, "single time series"),
        }
    }
}

/// Variant-specific payload of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SeriesData {
    /// One window per forecast issue time.
    Deterministic(WindowStore),
    /// One sub-trajectory per percentile label per issue time.
    Probabilistic { store: EnsembleStore, percentiles: Vec<f64> },
    /// One sub-trajectory per scenario per issue time.
    Scenarios { store: EnsembleStore, scenario_count: usize },
    /// A single contiguous trajectory; count is always 1.
    Single(WindowStore),
}

/// A complete forecast object: identity, resolution, feature tags, and the
/// windowed payload. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    name: String,
    resolution: Period,
    payload_uuid: Uuid,
    scaling_factor_multiplier: Option<String>,
    features: BTreeMap<String, FeatureValue>,
    data: SeriesData,
}

impl Series {
    /// Build a deterministic forecast from a window-start -> raw window map.
    pub fn deterministic(
        name: impl Into<String>,
        raw: BTreeMap<DateTime<Utc>, Vec<RawValue>>,
        resolution: Period,
        normalization: NormalizationFactor,
        scaling_factor_multiplier: Option<String>,
    ) -> WindcastResult<Series> {
        let store = window_store_from_raw(raw)?;
        let store = normalize_window_store(store, normalization)?;
        Ok(Self::assemble(
            name.into(),
            resolution,
            scaling_factor_multiplier,
            SeriesData::Deterministic(store),
        ))
    }

    /// Build a contiguous single time series from (timestamp, value) points.
    /// The resolution is inferred from the timestamps.
    pub fn single_time_series(
        name: impl Into<String>,
        mut points: Vec<(DateTime<Utc>, RawValue)>,
        normalization: NormalizationFactor,
        scaling_factor_multiplier: Option<String>,
    ) -> WindcastResult<Series> {
        points.sort_by_key(|(timestamp, _)| *timestamp);
        let timestamps: Vec<_> = points.iter().map(|(timestamp, _)| *timestamp).collect();
        let resolution = infer_resolution(&timestamps)?;
        classify(points.iter().map(|(_, value)| value))?;
        let elements = points.into_iter().map(|(_, value)| PayloadElement::from(value)).collect();
        let window = Window::new(elements)?;
        let mut windows = BTreeMap::new();
        windows.insert(timestamps[0], window);
        let store = normalize_window_store(WindowStore::new(windows)?, normalization)?;
        Ok(Self::assemble(
            name.into(),
            resolution,
            scaling_factor_multiplier,
            SeriesData::Single(store),
        ))
    }

    /// Build a single time series from a time-indexed table. The table must
    /// have exactly one value column.
    pub fn from_table(
        name: impl Into<String>,
        table: &TimeTable,
        normalization: NormalizationFactor,
        scaling_factor_multiplier: Option<String>,
    ) -> WindcastResult<Series> {
        let (_, values) = table.single_column()?;
        let points = table
            .index()
            .iter()
            .zip(values)
            .map(|(timestamp, value)| (*timestamp, RawValue::Scalar(*value)))
            .collect();
        Self::single_time_series(name, points, normalization, scaling_factor_multiplier)
    }

    /// Build a single time series from a delimited file, delegating the read
    /// to the supplied collaborator. Rows must carry exactly one value.
    pub fn single_from_file(
        name: impl Into<String>,
        reader: &dyn SeriesReader,
        path: &Path,
        owner: &str,
        normalization: NormalizationFactor,
        scaling_factor_multiplier: Option<String>,
    ) -> WindcastResult<Series> {
        let mapping = reader.read_series(path, owner)?;
        let mut points = Vec::with_capacity(mapping.len());
        for (timestamp, values) in mapping {
            match values.as_slice() {
                [value] => points.push((timestamp, value.clone())),
                other => {
                    return Err(WindcastError::invalid_argument(format!(
                        "file row at {timestamp} has {} values; the contiguous construction \
                         path supports only single-value rows",
                        other.len()
                    )))
                }
            }
        }
        Self::single_time_series(name, points, normalization, scaling_factor_multiplier)
    }

    /// Build a deterministic forecast from a delimited file whose rows are
    /// whole forecast windows.
    pub fn deterministic_from_file(
        name: impl Into<String>,
        reader: &dyn SeriesReader,
        path: &Path,
        owner: &str,
        resolution: Period,
        normalization: NormalizationFactor,
        scaling_factor_multiplier: Option<String>,
    ) -> WindcastResult<Series> {
        let mapping = reader.read_series(path, owner)?;
        Self::deterministic(name, mapping, resolution, normalization, scaling_factor_multiplier)
    }

    /// Build a probabilistic forecast: per window start, one sub-trajectory
    /// per percentile label.
    pub fn probabilistic(
        name: impl Into<String>,
        raw: BTreeMap<DateTime<Utc>, Vec<Vec<RawValue>>>,
        percentiles: Vec<f64>,
        resolution: Period,
        normalization: NormalizationFactor,
        scaling_factor_multiplier: Option<String>,
    ) -> WindcastResult<Series> {
        if percentiles.is_empty() {
            return Err(WindcastError::invalid_argument(
                "at least one percentile label is required",
            ));
        }
        for (start, group) in &raw {
            if group.len() != percentiles.len() {
                return Err(WindcastError::data_format(format!(
                    "window group at {start} has {} sub-trajectories, expected one per \
                     percentile ({})",
                    group.len(),
                    percentiles.len()
                )));
            }
        }
        let store = ensemble_store_from_raw(raw)?;
        let store = normalize_ensemble_store(store, normalization)?;
        Ok(Self::assemble(
            name.into(),
            resolution,
            scaling_factor_multiplier,
            SeriesData::Probabilistic { store, percentiles },
        ))
    }

    /// Build a scenario ensemble; the scenario count is taken from the data.
    pub fn scenarios(
        name: impl Into<String>,
        raw: BTreeMap<DateTime<Utc>, Vec<Vec<RawValue>>>,
        resolution: Period,
        normalization: NormalizationFactor,
        scaling_factor_multiplier: Option<String>,
    ) -> WindcastResult<Series> {
        let store = ensemble_store_from_raw(raw)?;
        let store = normalize_ensemble_store(store, normalization)?;
        let scenario_count = store.width();
        Ok(Self::assemble(
            name.into(),
            resolution,
            scaling_factor_multiplier,
            SeriesData::Scenarios { store, scenario_count },
        ))
    }

    fn assemble(
        name: String,
        resolution: Period,
        scaling_factor_multiplier: Option<String>,
        data: SeriesData,
    ) -> Series {
        let series = Series {
            name,
            resolution,
            payload_uuid: Uuid::new_v4(),
            scaling_factor_multiplier,
            features: BTreeMap::new(),
            data,
        };
        debug!(
            name = %series.name,
            kind = %series.kind(),
            count = series.count(),
            horizon = series.horizon(),
            "constructed forecast series"
        );
        series
    }

    /// Attach a feature tag. Intended for use right after construction.
    pub fn with_feature(mut self, key: impl Into<String>, value: impl Into<FeatureValue>) -> Series {
        self.features.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolution(&self) -> Period {
        self.resolution
    }

    pub fn payload_uuid(&self) -> Uuid {
        self.payload_uuid
    }

    pub fn scaling_factor_multiplier(&self) -> Option<&str> {
        self.scaling_factor_multiplier.as_deref()
    }

    pub fn features(&self) -> &BTreeMap<String, FeatureValue> {
        &self.features
    }

    pub fn data(&self) -> &SeriesData {
        &self.data
    }

    pub fn kind(&self) -> SeriesKind {
        match &self.data {
            SeriesData::Deterministic(_) => SeriesKind::Deterministic,
            SeriesData::Probabilistic { .. } => SeriesKind::Probabilistic,
            SeriesData::Scenarios { .. } => SeriesKind::Scenarios,
            SeriesData::Single(_) => SeriesKind::SingleTimeSeries,
        }
    }

    pub fn element_kind(&self) -> ElementKind {
        match &self.data {
            SeriesData::Deterministic(store) | SeriesData::Single(store) => store.kind(),
            SeriesData::Probabilistic { store, .. } | SeriesData::Scenarios { store, .. } => {
                store.kind()
            }
        }
    }

    pub fn count(&self) -> usize {
        match &self.data {
            SeriesData::Deterministic(store) | SeriesData::Single(store) => store.count(),
            SeriesData::Probabilistic { store, .. } | SeriesData::Scenarios { store, .. } => {
                store.count()
            }
        }
    }

    pub fn horizon(&self) -> usize {
        match &self.data {
            SeriesData::Deterministic(store) | SeriesData::Single(store) => store.horizon(),
            SeriesData::Probabilistic { store, .. } | SeriesData::Scenarios { store, .. } => {
                store.horizon()
            }
        }
    }

    /// Spacing between consecutive window starts; zero when `count <= 1`.
    pub fn interval(&self) -> Duration {
        match &self.data {
            SeriesData::Deterministic(store) | SeriesData::Single(store) => store.interval(),
            SeriesData::Probabilistic { store, .. } | SeriesData::Scenarios { store, .. } => {
                store.interval()
            }
        }
    }

    pub fn initial_timestamp(&self) -> DateTime<Utc> {
        match &self.data {
            SeriesData::Deterministic(store) | SeriesData::Single(store) => {
                store.initial_timestamp()
            }
            SeriesData::Probabilistic { store, .. } | SeriesData::Scenarios { store, .. } => {
                store.initial_timestamp()
            }
        }
    }

    /// The ordered window-start timestamps.
    pub fn initial_times(&self) -> Vec<DateTime<Utc>> {
        initial_times(self.initial_timestamp(), self.count(), self.interval())
    }

    pub fn percentiles(&self) -> Option<&[f64]> {
        match &self.data {
            SeriesData::Probabilistic { percentiles, .. } => Some(percentiles),
            _ => None,
        }
    }

    pub fn scenario_count(&self) -> Option<usize> {
        match &self.data {
            SeriesData::Scenarios { scenario_count, .. } => Some(*scenario_count),
            _ => None,
        }
    }

    /// The window starting exactly at `start`, truncated to `len` timesteps
    /// when `len` is given and does not exceed the horizon.
    pub fn get_window(
        &self,
        start: DateTime<Utc>,
        len: Option<usize>,
    ) -> WindcastResult<Window> {
        let store = self.single_store()?;
        if len == Some(0) {
            return Err(WindcastError::invalid_argument(
                "window truncation length must be positive",
            ));
        }
        let window = store.get(start).ok_or_else(|| {
            WindcastError::invalid_argument(format!("no window starts at {start}"))
        })?;
        Ok(match len {
            Some(n) if n <= store.horizon() => window.truncated(n),
            _ => window.clone(),
        })
    }

    /// The sub-trajectory set starting exactly at `start`, for ensemble
    /// variants.
    pub fn get_window_set(
        &self,
        start: DateTime<Utc>,
        len: Option<usize>,
    ) -> WindcastResult<Vec<Window>> {
        let store = self.ensemble_store()?;
        if len == Some(0) {
            return Err(WindcastError::invalid_argument(
                "window truncation length must be positive",
            ));
        }
        let group = store.get(start).ok_or_else(|| {
            WindcastError::invalid_argument(format!("no window group starts at {start}"))
        })?;
        Ok(match len {
            Some(n) if n <= store.horizon() => group.iter().map(|w| w.truncated(n)).collect(),
            _ => group.to_vec(),
        })
    }

    /// Lazy traversal of (start, window) pairs in ascending order. Each call
    /// yields a fresh iterator over the same sequence.
    pub fn iter_windows(
        &self,
    ) -> WindcastResult<impl Iterator<Item = (DateTime<Utc>, &Window)>> {
        Ok(self.single_store()?.iter())
    }

    /// Ensemble counterpart of [`Series::iter_windows`].
    pub fn iter_window_sets(
        &self,
    ) -> WindcastResult<impl Iterator<Item = (DateTime<Utc>, &[Window])>> {
        Ok(self.ensemble_store()?.iter())
    }

    /// Reconstruct the full (timestamp, value) trajectory of the sole window.
    /// Only valid when the store holds exactly one window.
    pub fn single_trajectory(&self) -> WindcastResult<Vec<(DateTime<Utc>, PayloadElement)>> {
        let store = self.single_store()?;
        if store.count() != 1 {
            return Err(WindcastError::invalid_argument(format!(
                "single-trajectory materialization requires exactly one window, store has {}",
                store.count()
            )));
        }
        let (start, window) = store
            .iter()
            .next()
            .ok_or_else(|| WindcastError::data_format("window store is empty"))?;
        let step = self.resolution.to_duration();
        Ok(window
            .elements()
            .iter()
            .enumerate()
            .map(|(i, element)| (start + step * i as i32, element.clone()))
            .collect())
    }

    /// A derived series holding only the named window starts. All other
    /// fields are preserved; the payload reference identity is freshly
    /// minted so the copy is never mistaken for the source artifact.
    pub fn window_subset(&self, starts: &[DateTime<Utc>]) -> WindcastResult<Series> {
        let data = match &self.data {
            SeriesData::Deterministic(store) => SeriesData::Deterministic(store.subset(starts)?),
            SeriesData::Single(store) => SeriesData::Single(store.subset(starts)?),
            SeriesData::Probabilistic { store, percentiles } => SeriesData::Probabilistic {
                store: store.subset(starts)?,
                percentiles: percentiles.clone(),
            },
            SeriesData::Scenarios { store, scenario_count } => SeriesData::Scenarios {
                store: store.subset(starts)?,
                scenario_count: *scenario_count,
            },
        };
        Ok(self.with_data(data))
    }

    /// Pair this series' metadata and shape with a replacement payload of the
    /// same variant. Mints a new payload identity.
    pub fn with_payload(&self, data: SeriesData) -> WindcastResult<Series> {
        let same_variant = matches!(
            (&self.data, &data),
            (SeriesData::Deterministic(_), SeriesData::Deterministic(_))
                | (SeriesData::Probabilistic { .. }, SeriesData::Probabilistic { .. })
                | (SeriesData::Scenarios { .. }, SeriesData::Scenarios { .. })
                | (SeriesData::Single(_), SeriesData::Single(_))
        );
        if !same_variant {
            return Err(WindcastError::invalid_argument(format!(
                "replacement payload variant does not match the source series ({})",
                self.kind()
            )));
        }
        Ok(self.with_data(data))
    }

    fn with_data(&self, data: SeriesData) -> Series {
        Series {
            name: self.name.clone(),
            resolution: self.resolution,
            payload_uuid: Uuid::new_v4(),
            scaling_factor_multiplier: self.scaling_factor_multiplier.clone(),
            features: self.features.clone(),
            data,
        }
    }

    /// Snapshot of the indexable metadata for this series.
    pub fn metadata(&self) -> WindcastResult<SeriesMetadata> {
        let count = self.count();
        let interval = if count <= 1 {
            None
        } else {
            Some(Period::from_duration(self.interval())?)
        };
        Ok(SeriesMetadata {
            name: self.name.clone(),
            resolution: self.resolution,
            initial_timestamp: self.initial_timestamp(),
            interval,
            count,
            horizon: self.horizon(),
            payload_uuid: self.payload_uuid,
            scaling_factor_multiplier: self.scaling_factor_multiplier.clone(),
            features: self.features.clone(),
        })
    }

    fn single_store(&self) -> WindcastResult<&WindowStore> {
        match &self.data {
            SeriesData::Deterministic(store) | SeriesData::Single(store) => Ok(store),
            _ => Err(WindcastError::invalid_argument(format!(
                "{} series hold window ensembles; use the ensemble accessors",
                self.kind()
            ))),
        }
    }

    fn ensemble_store(&self) -> WindcastResult<&EnsembleStore> {
        match &self.data {
            SeriesData::Probabilistic { store, .. } | SeriesData::Scenarios { store, .. } => {
                Ok(store)
            }
            _ => Err(WindcastError::invalid_argument(format!(
                "{} series hold one window per start; use the window accessors",
                self.kind()
            ))),
        }
    }
}

fn window_store_from_raw(
    raw: BTreeMap<DateTime<Utc>, Vec<RawValue>>,
) -> WindcastResult<WindowStore> {
    classify(raw.values().flatten())?;
    let mut windows = BTreeMap::new();
    for (start, values) in raw {
        let elements = values.into_iter().map(PayloadElement::from).collect();
        windows.insert(start, Window::new(elements)?);
    }
    WindowStore::new(windows)
}

fn ensemble_store_from_raw(
    raw: BTreeMap<DateTime<Utc>, Vec<Vec<RawValue>>>,
) -> WindcastResult<EnsembleStore> {
    classify(raw.values().flatten().flatten())?;
    let mut groups = BTreeMap::new();
    for (start, group) in raw {
        let mut windows = Vec::with_capacity(group.len());
        for values in group {
            let elements = values.into_iter().map(PayloadElement::from).collect();
            windows.push(Window::new(elements)?);
        }
        groups.insert(start, windows);
    }
    EnsembleStore::new(groups)
}

fn divisor_for(normalization: NormalizationFactor, max_abs: f64) -> WindcastResult<Option<f64>> {
    match normalization {
        NormalizationFactor::Unscaled => Ok(None),
        NormalizationFactor::Value(factor) => {
            if factor == 0.0 || !factor.is_finite() {
                return Err(WindcastError::invalid_argument(format!(
                    "normalization factor must be finite and non-zero, got {factor}"
                )));
            }
            Ok(Some(factor))
        }
        NormalizationFactor::Max => {
            if max_abs == 0.0 {
                return Err(WindcastError::invalid_argument(
                    "cannot max-normalize a series whose values are all zero",
                ));
            }
            Ok(Some(max_abs))
        }
    }
}

fn normalize_window_store(
    store: WindowStore,
    normalization: NormalizationFactor,
) -> WindcastResult<WindowStore> {
    match divisor_for(normalization, store.max_abs())? {
        Some(divisor) => Ok(store.map_values(&|v| v / divisor)),
        None => Ok(store),
    }
}

fn normalize_ensemble_store(
    store: EnsembleStore,
    normalization: NormalizationFactor,
) -> WindcastResult<EnsembleStore> {
    match divisor_for(normalization, store.max_abs())? {
        Some(divisor) => Ok(store.map_values(&|v| v / divisor)),
        None => Ok(store),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    fn scalar_window(values: &[f64]) -> Vec<RawValue> {
        values.iter().map(|v| RawValue::Scalar(*v)).collect()
    }

    fn two_window_series(normalization: NormalizationFactor) -> Series {
        let mut raw = BTreeMap::new();
        raw.insert(ts(0), scalar_window(&[1.0, 2.0]));
        raw.insert(ts(6), scalar_window(&[3.0, 4.0]));
        Series::deterministic("load", raw, Period::hours(1), normalization, None).unwrap()
    }

    fn window_values(window: &Window) -> Vec<f64> {
        window.elements().iter().filter_map(|e| e.as_constant()).collect()
    }

    #[test]
    fn test_construction_normalizes_values() {
        let series = two_window_series(NormalizationFactor::Value(2.0));
        let first = series.get_window(ts(0), None).unwrap();
        let second = series.get_window(ts(6), None).unwrap();
        assert_eq!(window_values(&first), vec![0.5, 1.0]);
        assert_eq!(window_values(&second), vec![1.5, 2.0]);
    }

    #[test]
    fn test_max_normalization_divides_by_peak() {
        let series = two_window_series(NormalizationFactor::Max);
        let second = series.get_window(ts(6), None).unwrap();
        assert_eq!(window_values(&second), vec![0.75, 1.0]);
    }

    #[test]
    fn test_zero_normalization_factor_is_rejected() {
        let mut raw = BTreeMap::new();
        raw.insert(ts(0), scalar_window(&[1.0]));
        let err = Series::deterministic(
            "load",
            raw,
            Period::hours(1),
            NormalizationFactor::Value(0.0),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, WindcastError::InvalidArgument { .. }));
    }

    #[test]
    fn test_accessors() {
        let series = two_window_series(NormalizationFactor::Unscaled);
        assert_eq!(series.kind(), SeriesKind::Deterministic);
        assert_eq!(series.count(), 2);
        assert_eq!(series.horizon(), 2);
        assert_eq!(series.interval(), Duration::hours(6));
        assert_eq!(series.initial_timestamp(), ts(0));
        assert_eq!(series.initial_times(), vec![ts(0), ts(6)]);
    }

    #[test]
    fn test_get_window_requires_exact_key() {
        let series = two_window_series(NormalizationFactor::Unscaled);
        let err = series.get_window(ts(3), None).unwrap_err();
        assert!(matches!(err, WindcastError::InvalidArgument { .. }));
    }

    #[test]
    fn test_get_window_truncation() {
        let series = two_window_series(NormalizationFactor::Unscaled);
        let window = series.get_window(ts(0), Some(1)).unwrap();
        assert_eq!(window_values(&window), vec![1.0]);
        // len beyond the horizon returns the full window
        let window = series.get_window(ts(0), Some(99)).unwrap();
        assert_eq!(window_values(&window), vec![1.0, 2.0]);
    }

    #[test]
    fn test_iter_windows_is_ascending_and_restartable() {
        let series = two_window_series(NormalizationFactor::Unscaled);
        let first_pass: Vec<_> = series.iter_windows().unwrap().map(|(t, w)| (t, w.clone())).collect();
        let second_pass: Vec<_> = series.iter_windows().unwrap().map(|(t, w)| (t, w.clone())).collect();
        assert_eq!(first_pass, second_pass);
        assert!(first_pass.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[test]
    fn test_single_trajectory_requires_one_window() {
        let series = two_window_series(NormalizationFactor::Unscaled);
        let err = series.single_trajectory().unwrap_err();
        assert!(matches!(err, WindcastError::InvalidArgument { .. }));
    }

    #[test]
    fn test_single_time_series_round_trip() {
        let points = vec![
            (ts(0), RawValue::Scalar(10.0)),
            (ts(1), RawValue::Scalar(20.0)),
            (ts(2), RawValue::Scalar(30.0)),
        ];
        let series =
            Series::single_time_series("load", points, NormalizationFactor::Unscaled, None)
                .unwrap();
        assert_eq!(series.kind(), SeriesKind::SingleTimeSeries);
        assert_eq!(series.resolution(), Period::hours(1));
        assert_eq!(series.count(), 1);
        assert_eq!(series.interval(), Duration::zero());

        let trajectory = series.single_trajectory().unwrap();
        assert_eq!(trajectory.len(), 3);
        assert_eq!(trajectory[2], (ts(2), PayloadElement::Constant(30.0)));
    }

    #[test]
    fn test_single_time_series_rejects_irregular_timestamps() {
        let points = vec![
            (ts(0), RawValue::Scalar(1.0)),
            (ts(1), RawValue::Scalar(2.0)),
            (ts(5), RawValue::Scalar(3.0)),
        ];
        let err = Series::single_time_series("load", points, NormalizationFactor::Unscaled, None)
            .unwrap_err();
        assert!(matches!(err, WindcastError::DataFormat { .. }));
    }

    #[test]
    fn test_from_table_single_column() {
        let table = TimeTable::new(
            vec![ts(0), ts(1), ts(2)],
            vec![("load".to_string(), vec![2.0, 4.0, 6.0])],
        )
        .unwrap();
        let series =
            Series::from_table("load", &table, NormalizationFactor::Value(2.0), None).unwrap();
        let trajectory = series.single_trajectory().unwrap();
        let values: Vec<f64> = trajectory.iter().filter_map(|(_, e)| e.as_constant()).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_probabilistic_group_width_must_match_labels() {
        let mut raw = BTreeMap::new();
        raw.insert(ts(0), vec![scalar_window(&[1.0]), scalar_window(&[2.0])]);
        let err = Series::probabilistic(
            "load",
            raw,
            vec![0.1, 0.5, 0.9],
            Period::hours(1),
            NormalizationFactor::Unscaled,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, WindcastError::DataFormat { .. }));
    }

    #[test]
    fn test_probabilistic_accessors() {
        let mut raw = BTreeMap::new();
        raw.insert(ts(0), vec![scalar_window(&[1.0, 2.0]), scalar_window(&[3.0, 4.0])]);
        raw.insert(ts(12), vec![scalar_window(&[5.0, 6.0]), scalar_window(&[7.0, 8.0])]);
        let series = Series::probabilistic(
            "load",
            raw,
            vec![0.25, 0.75],
            Period::hours(1),
            NormalizationFactor::Unscaled,
            None,
        )
        .unwrap();
        assert_eq!(series.kind(), SeriesKind::Probabilistic);
        assert_eq!(series.percentiles(), Some(&[0.25, 0.75][..]));
        assert_eq!(series.count(), 2);
        assert_eq!(series.horizon(), 2);

        let group = series.get_window_set(ts(12), None).unwrap();
        assert_eq!(group.len(), 2);
        // window accessors are for single-window variants only
        assert!(series.get_window(ts(12), None).is_err());
    }

    #[test]
    fn test_scenarios_derive_count_from_data() {
        let mut raw = BTreeMap::new();
        raw.insert(
            ts(0),
            vec![scalar_window(&[1.0]), scalar_window(&[2.0]), scalar_window(&[3.0])],
        );
        let series = Series::scenarios(
            "wind",
            raw,
            Period::hours(1),
            NormalizationFactor::Unscaled,
            None,
        )
        .unwrap();
        assert_eq!(series.scenario_count(), Some(3));
    }

    #[test]
    fn test_window_subset_mints_fresh_identity() {
        let series = two_window_series(NormalizationFactor::Unscaled);
        let subset = series.window_subset(&[ts(6)]).unwrap();
        assert_eq!(subset.count(), 1);
        assert_eq!(subset.name(), series.name());
        assert_eq!(subset.resolution(), series.resolution());
        assert_ne!(subset.payload_uuid(), series.payload_uuid());
    }

    #[test]
    fn test_with_payload_requires_matching_variant() {
        let series = two_window_series(NormalizationFactor::Unscaled);
        let other = Series::single_time_series(
            "load",
            vec![(ts(0), RawValue::Scalar(1.0)), (ts(1), RawValue::Scalar(2.0))],
            NormalizationFactor::Unscaled,
            None,
        )
        .unwrap();
        let err = series.with_payload(other.data().clone()).unwrap_err();
        assert!(matches!(err, WindcastError::InvalidArgument { .. }));

        let replacement = series.window_subset(&[ts(0)]).unwrap().data().clone();
        let derived = series.with_payload(replacement).unwrap();
        assert_ne!(derived.payload_uuid(), series.payload_uuid());
    }

    #[test]
    fn test_metadata_snapshot() {
        let series = two_window_series(NormalizationFactor::Unscaled)
            .with_feature("scenario", "high_wind")
            .with_feature("year", 2030i64);
        let metadata = series.metadata().unwrap();
        assert_eq!(metadata.count, 2);
        assert_eq!(metadata.horizon, 2);
        assert_eq!(metadata.interval, Some(Period::hours(6)));
        assert_eq!(metadata.payload_uuid, series.payload_uuid());
        assert_eq!(metadata.features.len(), 2);

        let single = Series::single_time_series(
            "load",
            vec![(ts(0), RawValue::Scalar(1.0)), (ts(1), RawValue::Scalar(2.0))],
            NormalizationFactor::Unscaled,
            None,
        )
        .unwrap();
        assert_eq!(single.metadata().unwrap().interval, None);
    }

    #[test]
    fn test_mixed_payload_shapes_fail_construction() {
        let mut raw = BTreeMap::new();
        raw.insert(ts(0), vec![RawValue::Scalar(1.0)]);
        raw.insert(ts(1), vec![RawValue::Tuple(vec![1.0, 2.0])]);
        let err = Series::deterministic(
            "cost",
            raw,
            Period::hours(1),
            NormalizationFactor::Unscaled,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, WindcastError::DataFormat { .. }));
    }
}
