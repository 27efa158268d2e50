use polars::prelude::*;

use crate::error::SurveyError;
use crate::filter::FilteredViews;
use crate::schema::trip;

/// Grouping dimension for trip-count sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Period,
    Origin,
    Destination,
}

impl Dimension {
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Period => trip::PERIOD,
            Dimension::Origin => trip::ORIGIN,
            Dimension::Destination => trip::DESTINATION,
        }
    }
}

/// A grouped trip-count table: `(key, trips)`, ascending by key.
///
/// Keys with no matching trips are absent rather than zero.
#[derive(Debug, Clone)]
pub struct Aggregate {
    dimension: Dimension,
    frame: DataFrame,
}

impl Aggregate {
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn rows(&self) -> Result<Vec<(i64, f64)>, SurveyError> {
        let keys = self.frame.column(self.dimension.column())?.i64()?;
        let trips = self.frame.column(trip::TRIPS)?.f64()?;

        Ok(keys
            .into_iter()
            .zip(trips)
            .filter_map(|(k, t)| Some((k?, t.unwrap_or(0.0))))
            .collect())
    }

    pub fn total(&self) -> Result<f64, SurveyError> {
        Ok(self.rows()?.iter().map(|(_, t)| t).sum())
    }
}

/// Sum `trips` per distinct value of `dimension`.
pub fn sum_trips_by(df: &DataFrame, dimension: Dimension) -> Result<Aggregate, SurveyError> {
    let key = dimension.column();
    let frame = df
        .clone()
        .lazy()
        .group_by([col(key)])
        .agg([col(trip::TRIPS).sum()])
        .sort([key], SortMultipleOptions::default())
        .collect()?;

    Ok(Aggregate { dimension, frame })
}

/// Hourly distribution of the mode-filtered trips.
pub fn temporal(views: &FilteredViews) -> Result<Aggregate, SurveyError> {
    sum_trips_by(&views.base, Dimension::Period)
}

/// Trips generated toward each zone: destination-anchored rows by destination.
pub fn generation(views: &FilteredViews) -> Result<Aggregate, SurveyError> {
    sum_trips_by(&views.split.destination_anchored, Dimension::Destination)
}

/// Trips attracted from each zone: origin-anchored rows by origin.
pub fn attraction(views: &FilteredViews) -> Result<Aggregate, SurveyError> {
    sum_trips_by(&views.split.origin_anchored, Dimension::Origin)
}
