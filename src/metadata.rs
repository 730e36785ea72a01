use crate::time::Period;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lightweight, indexable description of a series. Metadata and payload have
/// independent lifecycles; `payload_uuid` is how they are rejoined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub name: String,
    pub resolution: Period,
    pub initial_timestamp: DateTime<Utc>,
    /// Spacing between window starts; `None` when the series holds a single
    /// window and the interval is undefined.
    pub interval: Option<Period>,
    pub count: usize,
    pub horizon: usize,
    /// Reference to the out-of-line payload.
    pub payload_uuid: Uuid,
    /// Named transform applied at read time by the owning collaborator,
    /// never by this engine.
    pub scaling_factor_multiplier: Option<String>,
    /// Arbitrary annotations distinguishing otherwise-identical series.
    pub features: BTreeMap<String, FeatureValue>,
}

/// One feature tag value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Bool(value)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Int(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}
