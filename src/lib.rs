//! Origin-destination travel survey exploration core.
//!
//! Loads partitioned survey files into one trip table, then filters it by
//! mode, hour window and zone and aggregates trip counts by hour and by zone.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod pipeline;
pub mod schema;
pub mod zones;

#[cfg(feature = "python")]
mod python;

pub use aggregation::{Aggregate, Dimension};
pub use config::SurveyConfig;
pub use error::SurveyError;
pub use filter::{FilterState, FilteredViews, Modes, PeriodRange, ZoneSelection};
pub use loader::{load_partitions, load_trips, CsvFormat, TripRecord, TripTable};
pub use pipeline::{Exploration, SurveyPipeline};
pub use zones::ZoneIndex;
