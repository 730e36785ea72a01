use crate::error::{WindcastError, WindcastResult};
use crate::payload::{ElementKind, PayloadElement};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One forecast trajectory of fixed length (the horizon).
///
/// Every element shares one shape; heterogeneity is rejected at construction.
/// Deserialization runs through [`Window::new`], so crafted input cannot
/// bypass the invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WindowRepr")]
pub struct Window {
    elements: Vec<PayloadElement>,
}

#[derive(Deserialize)]
struct WindowRepr {
    elements: Vec<PayloadElement>,
}

impl TryFrom<WindowRepr> for Window {
    type Error = WindcastError;

    fn try_from(repr: WindowRepr) -> WindcastResult<Window> {
        Window::new(repr.elements)
    }
}

impl Window {
    pub fn new(elements: Vec<PayloadElement>) -> WindcastResult<Self> {
        let first = elements
            .first()
            .ok_or_else(|| WindcastError::data_format("a window must contain at least one timestep"))?;
        let kind = first.kind();
        if let ElementKind::Polynomial(degree) = kind {
            if !(2..=3).contains(&degree) {
                return Err(WindcastError::data_format(format!(
                    "polynomial elements must have 2 or 3 coefficients, got {degree}"
                )));
            }
        }
        for element in &elements[1..] {
            if element.kind() != kind {
                return Err(WindcastError::data_format(format!(
                    "mixed payload shapes within one window: {} vs {}",
                    kind,
                    element.kind()
                )));
            }
        }
        Ok(Self { elements })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn kind(&self) -> ElementKind {
        // non-empty is a construction invariant
        self.elements[0].kind()
    }

    pub fn elements(&self) -> &[PayloadElement] {
        &self.elements
    }

    /// The first `len` timesteps; the full window when `len` exceeds it.
    /// At least one timestep is always kept, preserving the non-empty
    /// construction invariant.
    pub fn truncated(&self, len: usize) -> Window {
        Window { elements: self.elements[..len.clamp(1, self.elements.len())].to_vec() }
    }

    pub(crate) fn map_values(&self, f: &impl Fn(f64) -> f64) -> Window {
        Window { elements: self.elements.iter().map(|e| e.map_values(f)).collect() }
    }

    pub(crate) fn max_abs(&self) -> f64 {
        self.elements.iter().fold(0.0, |acc, e| acc.max(e.max_abs()))
    }
}

/// Ordered window-start -> window map, owned exclusively by one series.
///
/// Construction enforces uniform horizon, uniform element shape, and uniform
/// spacing of the window starts. Deserialization runs through
/// [`WindowStore::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WindowStoreRepr")]
pub struct WindowStore {
    windows: BTreeMap<DateTime<Utc>, Window>,
}

#[derive(Deserialize)]
struct WindowStoreRepr {
    windows: BTreeMap<DateTime<Utc>, Window>,
}

impl TryFrom<WindowStoreRepr> for WindowStore {
    type Error = WindcastError;

    fn try_from(repr: WindowStoreRepr) -> WindcastResult<WindowStore> {
        WindowStore::new(repr.windows)
    }
}

impl WindowStore {
    pub fn new(windows: BTreeMap<DateTime<Utc>, Window>) -> WindcastResult<Self> {
        let mut iter = windows.values();
        let first = iter
            .next()
            .ok_or_else(|| WindcastError::data_format("a window store must contain at least one window"))?;
        let horizon = first.len();
        let kind = first.kind();
        for window in iter {
            if window.len() != horizon {
                return Err(WindcastError::data_format(format!(
                    "window horizons differ: {} vs {}",
                    horizon,
                    window.len()
                )));
            }
            if window.kind() != kind {
                return Err(WindcastError::data_format(format!(
                    "mixed payload shapes across windows: {} vs {}",
                    kind,
                    window.kind()
                )));
            }
        }
        validate_uniform_spacing(windows.keys().copied())?;
        Ok(Self { windows })
    }

    pub fn count(&self) -> usize {
        self.windows.len()
    }

    pub fn horizon(&self) -> usize {
        self.first().1.len()
    }

    pub fn kind(&self) -> ElementKind {
        self.first().1.kind()
    }

    pub fn initial_timestamp(&self) -> DateTime<Utc> {
        self.first().0
    }

    /// Spacing between consecutive window starts; zero when `count <= 1`.
    pub fn interval(&self) -> Duration {
        let mut keys = self.windows.keys();
        match (keys.next(), keys.next()) {
            (Some(a), Some(b)) => *b - *a,
            _ => Duration::zero(),
        }
    }

    pub fn get(&self, start: DateTime<Utc>) -> Option<&Window> {
        self.windows.get(&start)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, &Window)> {
        self.windows.iter().map(|(start, window)| (*start, window))
    }

    /// A new store holding only the named window starts. Every start must be
    /// present, and the picked starts must remain uniformly spaced.
    pub fn subset(&self, starts: &[DateTime<Utc>]) -> WindcastResult<WindowStore> {
        let mut windows = BTreeMap::new();
        for start in starts {
            let window = self.windows.get(start).ok_or_else(|| {
                WindcastError::invalid_argument(format!("no window starts at {start}"))
            })?;
            windows.insert(*start, window.clone());
        }
        WindowStore::new(windows)
    }

    pub(crate) fn map_values(&self, f: &impl Fn(f64) -> f64) -> WindowStore {
        WindowStore {
            windows: self
                .windows
                .iter()
                .map(|(start, window)| (*start, window.map_values(f)))
                .collect(),
        }
    }

    pub(crate) fn max_abs(&self) -> f64 {
        self.windows.values().fold(0.0, |acc, w| acc.max(w.max_abs()))
    }

    fn first(&self) -> (DateTime<Utc>, &Window) {
        let (start, window) = self
            .windows
            .iter()
            .next()
            .expect("window store is validated non-empty at construction");
        (*start, window)
    }
}

/// Per-start window ensembles: one sub-trajectory per percentile label or
/// scenario. All groups share one width, horizon, and element shape.
/// Deserialization runs through [`EnsembleStore::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EnsembleStoreRepr")]
pub struct EnsembleStore {
    groups: BTreeMap<DateTime<Utc>, Vec<Window>>,
}

#[derive(Deserialize)]
struct EnsembleStoreRepr {
    groups: BTreeMap<DateTime<Utc>, Vec<Window>>,
}

impl TryFrom<EnsembleStoreRepr> for EnsembleStore {
    type Error = WindcastError;

    fn try_from(repr: EnsembleStoreRepr) -> WindcastResult<EnsembleStore> {
        EnsembleStore::new(repr.groups)
    }
}

impl EnsembleStore {
    pub fn new(groups: BTreeMap<DateTime<Utc>, Vec<Window>>) -> WindcastResult<Self> {
        let mut iter = groups.iter();
        let (_, first_group) = iter.next().ok_or_else(|| {
            WindcastError::data_format("an ensemble store must contain at least one window group")
        })?;
        let width = first_group.len();
        if width == 0 {
            return Err(WindcastError::data_format(
                "an ensemble window group must contain at least one sub-trajectory",
            ));
        }
        let horizon = first_group[0].len();
        let kind = first_group[0].kind();
        for (start, group) in groups.iter() {
            if group.len() != width {
                return Err(WindcastError::data_format(format!(
                    "ensemble group at {start} has {} sub-trajectories, expected {width}",
                    group.len()
                )));
            }
            for window in group {
                if window.len() != horizon {
                    return Err(WindcastError::data_format(format!(
                        "sub-trajectory horizons differ at {start}: {} vs {horizon}",
                        window.len()
                    )));
                }
                if window.kind() != kind {
                    return Err(WindcastError::data_format(format!(
                        "mixed payload shapes across sub-trajectories at {start}: {} vs {kind}",
                        window.kind()
                    )));
                }
            }
        }
        validate_uniform_spacing(groups.keys().copied())?;
        Ok(Self { groups })
    }

    pub fn count(&self) -> usize {
        self.groups.len()
    }

    /// Sub-trajectories per window start.
    pub fn width(&self) -> usize {
        self.first().1.len()
    }

    pub fn horizon(&self) -> usize {
        self.first().1[0].len()
    }

    pub fn kind(&self) -> ElementKind {
        self.first().1[0].kind()
    }

    pub fn initial_timestamp(&self) -> DateTime<Utc> {
        self.first().0
    }

    pub fn interval(&self) -> Duration {
        let mut keys = self.groups.keys();
        match (keys.next(), keys.next()) {
            (Some(a), Some(b)) => *b - *a,
            _ => Duration::zero(),
        }
    }

    pub fn get(&self, start: DateTime<Utc>) -> Option<&[Window]> {
        self.groups.get(&start).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, &[Window])> {
        self.groups.iter().map(|(start, group)| (*start, group.as_slice()))
    }

    pub fn subset(&self, starts: &[DateTime<Utc>]) -> WindcastResult<EnsembleStore> {
        let mut groups = BTreeMap::new();
        for start in starts {
            let group = self.groups.get(start).ok_or_else(|| {
                WindcastError::invalid_argument(format!("no window group starts at {start}"))
            })?;
            groups.insert(*start, group.clone());
        }
        EnsembleStore::new(groups)
    }

    pub(crate) fn map_values(&self, f: &impl Fn(f64) -> f64) -> EnsembleStore {
        EnsembleStore {
            groups: self
                .groups
                .iter()
                .map(|(start, group)| (*start, group.iter().map(|w| w.map_values(f)).collect()))
                .collect(),
        }
    }

    pub(crate) fn max_abs(&self) -> f64 {
        self.groups
            .values()
            .flatten()
            .fold(0.0, |acc, w| acc.max(w.max_abs()))
    }

    fn first(&self) -> (DateTime<Utc>, &[Window]) {
        let (start, group) = self
            .groups
            .iter()
            .next()
            .expect("ensemble store is validated non-empty at construction");
        (*start, group.as_slice())
    }
}

fn validate_uniform_spacing(keys: impl Iterator<Item = DateTime<Utc>>) -> WindcastResult<()> {
    let keys: Vec<_> = keys.collect();
    if keys.len() < 3 {
        return Ok(());
    }
    let mut diffs: Vec<Duration> = keys.windows(2).map(|pair| pair[1] - pair[0]).collect();
    diffs.sort();
    diffs.dedup();
    if diffs.len() != 1 {
        return Err(WindcastError::data_format(
            "window start timestamps must be uniformly spaced",
        ));
    }
    Ok(())
}
