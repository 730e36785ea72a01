//! Windowed forecast time-series store.
//!
//! A series is a family of numeric forecasts keyed by reference time:
//! deterministic trajectories, percentile forecasts, scenario ensembles, or
//! one contiguous trajectory. Construction normalizes heterogeneous raw input
//! into a typed, immutable windowed store; the shaping engine turns that
//! store into the dense rectangular `f64` array a binary persistence
//! collaborator writes out.
//!
//! The core is synchronous and allocation-owned: constructing two series
//! concurrently shares no state, and a constructed series is safe to read
//! from any number of threads.

pub mod error;
pub mod metadata;
pub mod payload;
pub mod reader;
pub mod series;
pub mod shape;
pub mod sink;
pub mod table;
pub mod time;
pub mod window;

pub use error::{WindcastError, WindcastResult};
pub use metadata::{FeatureValue, SeriesMetadata};
pub use payload::{classify, raw_window_from_json, ElementKind, PayloadElement, RawValue};
pub use reader::{DelimitedReader, SeriesReader};
pub use series::{NormalizationFactor, Series, SeriesData, SeriesKind};
pub use shape::{shape_for_storage, shape_window, ShapedArray};
pub use sink::{ArraySink, BinarySink};
pub use table::TimeTable;
pub use time::{infer_resolution, initial_times, Period, TimeUnit};
pub use window::{EnsembleStore, Window, WindowStore};
