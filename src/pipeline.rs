use tracing::{debug, info};

use crate::aggregation::{self, Aggregate};
use crate::config::SurveyConfig;
use crate::error::SurveyError;
use crate::filter::{FilterState, FilteredViews};
use crate::loader::{self, TripTable};
use crate::schema::trip;
use crate::zones::ZoneIndex;

/// The loaded survey: unified trip table plus zone index.
///
/// Constructed once and only read afterwards, so a single instance can be
/// shared between concurrent callers; every `explore` call works on its own
/// derived tables.
#[derive(Debug, Clone)]
pub struct SurveyPipeline {
    trips: TripTable,
    zones: ZoneIndex,
}

/// Aggregates produced for one filter state.
#[derive(Debug, Clone)]
pub struct Exploration {
    /// `(period, trips)` over the mode-filtered trips.
    pub hourly: Aggregate,
    /// `(destination, trips)` over the destination-anchored trips.
    pub generation: Aggregate,
    /// `(origin, trips)` over the origin-anchored trips.
    pub attraction: Aggregate,
}

impl SurveyPipeline {
    /// Load partitions and boundaries named by `config`.
    pub fn load(config: &SurveyConfig) -> Result<Self, SurveyError> {
        let trips = loader::load_trips(config)?;
        let zones = ZoneIndex::from_config(&config.boundaries)?;
        Self::from_parts(trips, zones)
    }

    /// Assemble a pipeline, checking that every origin and destination in
    /// `trips` is a key of `zones`.
    pub fn from_parts(trips: TripTable, zones: ZoneIndex) -> Result<Self, SurveyError> {
        for column in [trip::ORIGIN, trip::DESTINATION] {
            if let Some(zone) = trips
                .zones_in(column)?
                .into_iter()
                .find(|&z| !zones.contains(z))
            {
                return Err(SurveyError::UnknownZone {
                    column: column.to_string(),
                    zone,
                });
            }
        }

        info!(
            trips = trips.height(),
            zones = zones.len(),
            "survey pipeline ready"
        );
        Ok(Self { trips, zones })
    }

    pub fn trips(&self) -> &TripTable {
        &self.trips
    }

    pub fn zones(&self) -> &ZoneIndex {
        &self.zones
    }

    /// Filter the trip table by `state` and compute the hourly, generation and
    /// attraction aggregates.
    pub fn explore(&self, state: &FilterState) -> Result<Exploration, SurveyError> {
        let views = FilteredViews::build(&self.trips, state)?;

        let exploration = Exploration {
            hourly: aggregation::temporal(&views)?,
            generation: aggregation::generation(&views)?,
            attraction: aggregation::attraction(&views)?,
        };

        debug!(
            hours = exploration.hourly.frame().height(),
            generation_zones = exploration.generation.frame().height(),
            attraction_zones = exploration.attraction.frame().height(),
            "computed aggregates"
        );
        Ok(exploration)
    }
}
