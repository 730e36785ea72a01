use crate::error::{WindcastError, WindcastResult};
use serde::{Deserialize, Serialize};

/// The value stored at one forecast timestep. Closed set: every operation
/// over payloads dispatches with an explicit match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PayloadElement {
    /// Single real number.
    Constant(f64),
    /// Fixed-length coefficient tuple; length (degree) is 2 or 3.
    Polynomial(Vec<f64>),
    /// Ordered (x, y) breakpoint curve, variable length.
    PiecewiseCurve(Vec<(f64, f64)>),
}

impl PayloadElement {
    pub fn kind(&self) -> ElementKind {
        match self {
            PayloadElement::Constant(_) => ElementKind::Constant,
            PayloadElement::Polynomial(coeffs) => ElementKind::Polynomial(coeffs.len()),
            PayloadElement::PiecewiseCurve(_) => ElementKind::PiecewiseCurve,
        }
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            PayloadElement::Constant(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_polynomial(&self) -> Option<&[f64]> {
        match self {
            PayloadElement::Polynomial(coeffs) => Some(coeffs),
            _ => None,
        }
    }

    pub fn as_points(&self) -> Option<&[(f64, f64)]> {
        match self {
            PayloadElement::PiecewiseCurve(points) => Some(points),
            _ => None,
        }
    }

    /// Apply `f` to every value component. Curve abscissae (x) are breakpoint
    /// locations, not values, and are left untouched.
    pub(crate) fn map_values(&self, f: impl Fn(f64) -> f64) -> PayloadElement {
        match self {
            PayloadElement::Constant(value) => PayloadElement::Constant(f(*value)),
            PayloadElement::Polynomial(coeffs) => {
                PayloadElement::Polynomial(coeffs.iter().map(|c| f(*c)).collect())
            }
            PayloadElement::PiecewiseCurve(points) => {
                PayloadElement::PiecewiseCurve(points.iter().map(|(x, y)| (*x, f(*y))).collect())
            }
        }
    }

    /// Largest absolute value component, for max-normalization.
    pub(crate) fn max_abs(&self) -> f64 {
        match self {
            PayloadElement::Constant(value) => value.abs(),
            PayloadElement::Polynomial(coeffs) => {
                coeffs.iter().fold(0.0, |acc, c| acc.max(c.abs()))
            }
            PayloadElement::PiecewiseCurve(points) => {
                points.iter().fold(0.0, |acc, (_, y)| acc.max(y.abs()))
            }
        }
    }
}

/// Structural shape of a payload element, including polynomial degree.
/// Piecewise point counts are intentionally absent here; they are validated
/// during array shaping, not at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Constant,
    Polynomial(usize),
    PiecewiseCurve,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Constant => write!(f, "constant"),
            ElementKind::Polynomial(degree) => write!(f, "polynomial({degree})"),
            ElementKind::PiecewiseCurve => write!(f, "piecewise curve"),
        }
    }
}

/// Raw per-timestep value before shape classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Scalar(f64),
    Tuple(Vec<f64>),
    Points(Vec<(f64, f64)>),
}

impl RawValue {
    fn kind(&self) -> ElementKind {
        match self {
            RawValue::Scalar(_) => ElementKind::Constant,
            RawValue::Tuple(coeffs) => ElementKind::Polynomial(coeffs.len()),
            RawValue::Points(_) => ElementKind::PiecewiseCurve,
        }
    }
}

impl From<RawValue> for PayloadElement {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Scalar(value) => PayloadElement::Constant(value),
            RawValue::Tuple(coeffs) => PayloadElement::Polynomial(coeffs),
            RawValue::Points(points) => PayloadElement::PiecewiseCurve(points),
        }
    }
}

/// Classify a raw value sequence into exactly one element kind.
///
/// All values must share one shape; polynomial tuples must all have the same
/// arity, and that arity must be 2 or 3. Anything else is a `DataFormat`
/// error.
pub fn classify<'a>(values: impl IntoIterator<Item = &'a RawValue>) -> WindcastResult<ElementKind> {
    let mut iter = values.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| WindcastError::data_format("cannot classify an empty value sequence"))?;
    let kind = first.kind();
    if let ElementKind::Polynomial(degree) = kind {
        if !(2..=3).contains(&degree) {
            return Err(WindcastError::data_format(format!(
                "polynomial tuples must have 2 or 3 coefficients, got {degree}"
            )));
        }
    }
    for value in iter {
        if value.kind() != kind {
            return Err(WindcastError::data_format(format!(
                "mixed payload shapes within one series: {} vs {}",
                kind,
                value.kind()
            )));
        }
    }
    Ok(kind)
}

/// Coerce one untyped JSON window into raw values.
///
/// Plain numbers carry no richer structural information, so they are narrowed
/// to `Constant` only when `assume_constant` is set; this is a deliberate
/// opt-in narrowing to the most common case, never an inferred default. With
/// the flag set, every item must be a plain number.
pub fn raw_window_from_json(
    window: &serde_json::Value,
    assume_constant: bool,
) -> WindcastResult<Vec<RawValue>> {
    let items = window.as_array().ok_or_else(|| {
        WindcastError::data_format("untyped window payload must be a JSON array")
    })?;
    if items.is_empty() {
        return Err(WindcastError::data_format("untyped window payload is empty"));
    }
    items
        .iter()
        .enumerate()
        .map(|(index, item)| raw_value_from_json(item, index, assume_constant))
        .collect()
}

fn raw_value_from_json(
    item: &serde_json::Value,
    index: usize,
    assume_constant: bool,
) -> WindcastResult<RawValue> {
    use serde_json::Value;

    if assume_constant {
        return match item.as_f64() {
            Some(value) => Ok(RawValue::Scalar(value)),
            None => Err(WindcastError::data_format(format!(
                "assume_constant is set but the value at timestep {index} is not a plain number"
            ))),
        };
    }

    match item {
        Value::Number(_) => Err(WindcastError::data_format(format!(
            "ambiguous untyped value at timestep {index}; enable assume_constant to coerce \
             plain numbers to constants"
        ))),
        Value::Array(inner) if inner.iter().all(|v| v.is_number()) => {
            let coeffs: Vec<f64> = inner.iter().filter_map(|v| v.as_f64()).collect();
            Ok(RawValue::Tuple(coeffs))
        }
        Value::Array(inner) => {
            let mut points = Vec::with_capacity(inner.len());
            for point in inner {
                let pair = point.as_array().ok_or_else(|| {
                    WindcastError::invalid_argument(format!(
                        "curve point at timestep {index} is not an (x, y) pair"
                    ))
                })?;
                if pair.len() != 2 {
                    return Err(WindcastError::invalid_argument(format!(
                        "curve point at timestep {index} has {} components, expected 2",
                        pair.len()
                    )));
                }
                let x = pair[0].as_f64();
                let y = pair[1].as_f64();
                match (x, y) {
                    (Some(x), Some(y)) => points.push((x, y)),
                    _ => {
                        return Err(WindcastError::data_format(format!(
                            "curve point at timestep {index} has non-numeric components"
                        )))
                    }
                }
            }
            Ok(RawValue::Points(points))
        }
        _ => Err(WindcastError::data_format(format!(
            "cannot classify untyped value at timestep {index}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_uniform_scalars() {
        let values = vec![RawValue::Scalar(1.0), RawValue::Scalar(2.0)];
        assert_eq!(classify(&values).unwrap(), ElementKind::Constant);
    }

    #[test]
    fn test_classify_uniform_tuples() {
        let values = vec![
            RawValue::Tuple(vec![1.0, 2.0, 3.0]),
            RawValue::Tuple(vec![4.0, 5.0, 6.0]),
        ];
        assert_eq!(classify(&values).unwrap(), ElementKind::Polynomial(3));
    }

    #[test]
    fn test_classify_rejects_mixed_shapes() {
        let values = vec![RawValue::Scalar(1.0), RawValue::Tuple(vec![1.0, 2.0])];
        let err = classify(&values).unwrap_err();
        assert!(matches!(err, WindcastError::DataFormat { .. }));
    }

    #[test]
    fn test_classify_rejects_mixed_tuple_arity() {
        let values = vec![
            RawValue::Tuple(vec![1.0, 2.0]),
            RawValue::Tuple(vec![1.0, 2.0, 3.0]),
        ];
        assert!(classify(&values).is_err());
    }

    #[test]
    fn test_classify_rejects_bad_degree() {
        let values = vec![RawValue::Tuple(vec![1.0, 2.0, 3.0, 4.0])];
        let err = classify(&values).unwrap_err();
        assert!(err.to_string().contains("2 or 3 coefficients"));
    }

    #[test]
    fn test_untyped_numbers_require_assume_constant() {
        let window = json!([1.0, 2.0, 3.0]);
        let err = raw_window_from_json(&window, false).unwrap_err();
        assert!(err.to_string().contains("assume_constant"));

        let values = raw_window_from_json(&window, true).unwrap();
        assert_eq!(values, vec![
            RawValue::Scalar(1.0),
            RawValue::Scalar(2.0),
            RawValue::Scalar(3.0),
        ]);
    }

    #[test]
    fn test_untyped_tuples_classify_without_flag() {
        let window = json!([[1.0, 2.0], [3.0, 4.0]]);
        let values = raw_window_from_json(&window, false).unwrap();
        assert_eq!(values, vec![
            RawValue::Tuple(vec![1.0, 2.0]),
            RawValue::Tuple(vec![3.0, 4.0]),
        ]);
    }

    #[test]
    fn test_untyped_curves_classify_without_flag() {
        let window = json!([[[0.0, 1.0], [1.0, 2.0]], [[0.0, 3.0], [1.0, 4.0]]]);
        let values = raw_window_from_json(&window, false).unwrap();
        assert_eq!(values[0], RawValue::Points(vec![(0.0, 1.0), (1.0, 2.0)]));
    }

    #[test]
    fn test_untyped_curve_point_arity_is_checked() {
        let window = json!([[[0.0, 1.0, 2.0]]]);
        let err = raw_window_from_json(&window, false).unwrap_err();
        assert!(matches!(err, WindcastError::InvalidArgument { .. }));
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn test_assume_constant_rejects_structured_values() {
        let window = json!([[1.0, 2.0]]);
        let err = raw_window_from_json(&window, true).unwrap_err();
        assert!(matches!(err, WindcastError::DataFormat { .. }));
    }

    #[test]
    fn test_map_values_leaves_curve_abscissae() {
        let element = PayloadElement::PiecewiseCurve(vec![(1.0, 10.0), (2.0, 20.0)]);
        let halved = element.map_values(|v| v / 2.0);
        assert_eq!(
            halved,
            PayloadElement::PiecewiseCurve(vec![(1.0, 5.0), (2.0, 10.0)])
        );
    }

    #[test]
    fn test_max_abs() {
        assert_eq!(PayloadElement::Constant(-3.0).max_abs(), 3.0);
        assert_eq!(PayloadElement::Polynomial(vec![1.0, -5.0]).max_abs(), 5.0);
        assert_eq!(
            PayloadElement::PiecewiseCurve(vec![(100.0, 2.0), (200.0, -4.0)]).max_abs(),
            4.0
        );
    }
}
