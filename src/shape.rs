use crate::error::{WindcastError, WindcastResult};
use crate::payload::{ElementKind, PayloadElement};
use crate::series::{Series, SeriesData};
use crate::window::{EnsembleStore, Window, WindowStore};
use ndarray::{Array1, Array2, Array3, Array4};
use tracing::trace;

/// Dense rectangular f64 array produced for binary persistence. Rank grows
/// with payload structure.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapedArray {
    D1(Array1<f64>),
    D2(Array2<f64>),
    D3(Array3<f64>),
    D4(Array4<f64>),
}

impl ShapedArray {
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            ShapedArray::D1(a) => a.shape(),
            ShapedArray::D2(a) => a.shape(),
            ShapedArray::D3(a) => a.shape(),
            ShapedArray::D4(a) => a.shape(),
        }
    }

    /// Values in row-major (logical) order.
    pub fn iter_values(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            ShapedArray::D1(a) => Box::new(a.iter().copied()),
            ShapedArray::D2(a) => Box::new(a.iter().copied()),
            ShapedArray::D3(a) => Box::new(a.iter().copied()),
            ShapedArray::D4(a) => Box::new(a.iter().copied()),
        }
    }
}

/// Shape one window into its minimal-rank dense array:
/// constants to `[horizon]`, polynomials to `[horizon, degree]`, piecewise
/// curves to `[horizon, n_points, 2]`.
pub fn shape_window(window: &Window) -> WindcastResult<ShapedArray> {
    let horizon = window.len();
    match window.kind() {
        ElementKind::Constant => {
            let mut array = Array1::<f64>::zeros(horizon);
            for (i, element) in window.elements().iter().enumerate() {
                array[i] = constant_value(element)?;
            }
            Ok(ShapedArray::D1(array))
        }
        ElementKind::Polynomial(degree) => {
            let mut array = Array2::<f64>::zeros((horizon, degree));
            for (i, element) in window.elements().iter().enumerate() {
                for (k, coeff) in polynomial_coeffs(element)?.iter().enumerate() {
                    array[[i, k]] = *coeff;
                }
            }
            Ok(ShapedArray::D2(array))
        }
        ElementKind::PiecewiseCurve => {
            let n_points = uniform_point_count(std::iter::once((None, window)))?;
            let mut array = Array3::<f64>::zeros((horizon, n_points, 2));
            for (i, element) in window.elements().iter().enumerate() {
                for (k, (x, y)) in curve_points(element)?.iter().enumerate() {
                    array[[i, k, 0]] = *x;
                    array[[i, k, 1]] = *y;
                }
            }
            Ok(ShapedArray::D3(array))
        }
    }
}

/// Transform a series' whole windowed store into the dense array handed to
/// the persistence collaborator.
///
/// Deterministic stores stack windows as columns; a single time series keeps
/// the minimal one-window rank; probabilistic and scenario stores with
/// constant payloads add a trailing label dimension. Anything richer under
/// an ensemble variant is a recognized-but-unimplemented combination.
pub fn shape_for_storage(series: &Series) -> WindcastResult<ShapedArray> {
    let array = match series.data() {
        SeriesData::Single(store) => {
            let (_, window) = store
                .iter()
                .next()
                .ok_or_else(|| WindcastError::data_format("window store is empty"))?;
            shape_window(window)?
        }
        SeriesData::Deterministic(store) => shape_full_store(store)?,
        SeriesData::Probabilistic { store, .. } => shape_ensemble(series, store)?,
        SeriesData::Scenarios { store, .. } => shape_ensemble(series, store)?,
    };
    trace!(name = %series.name(), shape = ?array.shape(), "shaped series for storage");
    Ok(array)
}

fn shape_full_store(store: &WindowStore) -> WindcastResult<ShapedArray> {
    let horizon = store.horizon();
    let count = store.count();
    match store.kind() {
        ElementKind::Constant => {
            let mut array = Array2::<f64>::zeros((horizon, count));
            for (j, (_, window)) in store.iter().enumerate() {
                for (i, element) in window.elements().iter().enumerate() {
                    array[[i, j]] = constant_value(element)?;
                }
            }
            Ok(ShapedArray::D2(array))
        }
        ElementKind::Polynomial(degree) => {
            let mut array = Array3::<f64>::zeros((horizon, count, degree));
            for (j, (_, window)) in store.iter().enumerate() {
                for (i, element) in window.elements().iter().enumerate() {
                    for (k, coeff) in polynomial_coeffs(element)?.iter().enumerate() {
                        array[[i, j, k]] = *coeff;
                    }
                }
            }
            Ok(ShapedArray::D3(array))
        }
        ElementKind::PiecewiseCurve => {
            let n_points =
                uniform_point_count(store.iter().map(|(start, window)| (Some(start), window)))?;
            let mut array = Array4::<f64>::zeros((horizon, count, n_points, 2));
            for (j, (_, window)) in store.iter().enumerate() {
                for (i, element) in window.elements().iter().enumerate() {
                    for (k, (x, y)) in curve_points(element)?.iter().enumerate() {
                        array[[i, j, k, 0]] = *x;
                        array[[i, j, k, 1]] = *y;
                    }
                }
            }
            Ok(ShapedArray::D4(array))
        }
    }
}

fn shape_ensemble(series: &Series, store: &EnsembleStore) -> WindcastResult<ShapedArray> {
    match store.kind() {
        ElementKind::Constant => {
            let mut array = Array3::<f64>::zeros((store.horizon(), store.count(), store.width()));
            for (j, (_, group)) in store.iter().enumerate() {
                for (k, window) in group.iter().enumerate() {
                    for (i, element) in window.elements().iter().enumerate() {
                        array[[i, j, k]] = constant_value(element)?;
                    }
                }
            }
            Ok(ShapedArray::D3(array))
        }
        kind => Err(WindcastError::not_implemented(
            "array shaping",
            format!("{} series with {} payloads", series.kind(), kind),
        )),
    }
}

fn uniform_point_count<'a>(
    windows: impl Iterator<Item = (Option<chrono::DateTime<chrono::Utc>>, &'a Window)>,
) -> WindcastResult<usize> {
    let mut n_points: Option<usize> = None;
    for (start, window) in windows {
        for (i, element) in window.elements().iter().enumerate() {
            let points = curve_points(element)?;
            match n_points {
                None => n_points = Some(points.len()),
                Some(n) if n != points.len() => {
                    let at = match start {
                        Some(start) => format!("window {start} timestep {i}"),
                        None => format!("timestep {i}"),
                    };
                    return Err(WindcastError::invalid_argument(format!(
                        "piecewise point-count mismatch: {at} has {} points, expected {n}",
                        points.len()
                    )));
                }
                Some(_) => {}
            }
        }
    }
    n_points.ok_or_else(|| WindcastError::data_format("no curve points to shape"))
}

fn constant_value(element: &PayloadElement) -> WindcastResult<f64> {
    element
        .as_constant()
        .ok_or_else(|| WindcastError::data_format("window element is not a constant"))
}

fn polynomial_coeffs(element: &PayloadElement) -> WindcastResult<&[f64]> {
    element
        .as_polynomial()
        .ok_or_else(|| WindcastError::data_format("window element is not a polynomial"))
}

fn curve_points(element: &PayloadElement) -> WindcastResult<&[(f64, f64)]> {
    element
        .as_points()
        .ok_or_else(|| WindcastError::data_format("window element is not a piecewise curve"))
}
