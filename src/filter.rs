use std::collections::BTreeSet;

use polars::prelude::*;
use tracing::debug;

use crate::error::SurveyError;
use crate::loader::TripTable;
use crate::schema::{mode, period, trip};

/// Selected transport mode labels. An empty selection excludes every trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modes(BTreeSet<String>);

impl Modes {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    /// Every canonical mode.
    pub fn all() -> Self {
        Self::new(mode::ALL)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    fn predicate(&self) -> Expr {
        let labels: Vec<&str> = self.0.iter().map(String::as_str).collect();
        member_of(trip::MODE, Series::new(trip::MODE.into(), labels))
    }
}

/// Inclusive hour window `[lo, hi]` with `0 <= lo <= hi <= 23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    lo: i64,
    hi: i64,
}

impl PeriodRange {
    pub fn new(lo: i64, hi: i64) -> Result<Self, SurveyError> {
        if period::MIN_HOUR <= lo && lo <= hi && hi <= period::MAX_HOUR {
            Ok(Self { lo, hi })
        } else {
            Err(SurveyError::Range { lo, hi })
        }
    }

    pub fn full() -> Self {
        Self {
            lo: period::MIN_HOUR,
            hi: period::MAX_HOUR,
        }
    }

    pub fn lo(&self) -> i64 {
        self.lo
    }

    pub fn hi(&self) -> i64 {
        self.hi
    }

    pub fn contains(&self, hour: i64) -> bool {
        (self.lo..=self.hi).contains(&hour)
    }

    fn predicate(&self) -> Expr {
        col(trip::PERIOD)
            .gt_eq(lit(self.lo))
            .and(col(trip::PERIOD).lt_eq(lit(self.hi)))
    }
}

impl Default for PeriodRange {
    fn default() -> Self {
        Self::full()
    }
}

/// Spatial restriction: no restriction, or a chosen set of zone keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ZoneSelection {
    #[default]
    All,
    Subset(BTreeSet<i64>),
}

impl ZoneSelection {
    /// An empty key list means no spatial restriction.
    pub fn from_keys(keys: impl IntoIterator<Item = i64>) -> Self {
        let keys: BTreeSet<i64> = keys.into_iter().collect();
        if keys.is_empty() {
            ZoneSelection::All
        } else {
            ZoneSelection::Subset(keys)
        }
    }
}

/// The three raw filter inputs of one interaction.
///
/// The default selects every canonical mode, the whole day and all zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub modes: Modes,
    pub period_range: PeriodRange,
    pub zones: ZoneSelection,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            modes: Modes::all(),
            period_range: PeriodRange::full(),
            zones: ZoneSelection::All,
        }
    }
}

impl FilterState {
    /// Build a filter state from raw selections, rejecting invalid hour bounds.
    pub fn new<I, S>(
        modes: I,
        period_range: (i64, i64),
        zones: impl IntoIterator<Item = i64>,
    ) -> Result<Self, SurveyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            modes: Modes::new(modes),
            period_range: PeriodRange::new(period_range.0, period_range.1)?,
            zones: ZoneSelection::from_keys(zones),
        })
    }
}

/// Window-filtered rows split by which end touches the selected zones.
#[derive(Debug, Clone)]
pub struct DirectionalSplit {
    /// Rows leaving the selected zones.
    pub origin_anchored: DataFrame,
    /// Rows entering the selected zones.
    pub destination_anchored: DataFrame,
}

/// Every derived table the aggregator needs for one interaction.
#[derive(Debug, Clone)]
pub struct FilteredViews {
    /// Mode filter only.
    pub base: DataFrame,
    /// Mode and hour-window filter.
    pub window: DataFrame,
    pub split: DirectionalSplit,
}

impl FilteredViews {
    pub fn build(table: &TripTable, state: &FilterState) -> Result<Self, SurveyError> {
        let base = base_filtered(table, &state.modes)?;
        let window = window_filtered(&base, state.period_range)?;
        let split = directional_split(&window, &state.zones)?;

        debug!(
            base = base.height(),
            window = window.height(),
            origin_anchored = split.origin_anchored.height(),
            destination_anchored = split.destination_anchored.height(),
            "filtered trip views"
        );

        Ok(Self {
            base,
            window,
            split,
        })
    }
}

/// Rows whose mode is one of `modes`.
pub fn base_filtered(table: &TripTable, modes: &Modes) -> Result<DataFrame, SurveyError> {
    Ok(table
        .frame()
        .clone()
        .lazy()
        .filter(modes.predicate())
        .collect()?)
}

/// Rows of `base` whose hour lies within `range`.
pub fn window_filtered(base: &DataFrame, range: PeriodRange) -> Result<DataFrame, SurveyError> {
    Ok(base.clone().lazy().filter(range.predicate()).collect()?)
}

/// Split the window-filtered rows by zone selection. With no selection both
/// sides are the whole window.
pub fn directional_split(
    window: &DataFrame,
    zones: &ZoneSelection,
) -> Result<DirectionalSplit, SurveyError> {
    match zones {
        ZoneSelection::All => Ok(DirectionalSplit {
            origin_anchored: window.clone(),
            destination_anchored: window.clone(),
        }),
        ZoneSelection::Subset(keys) => {
            let keys = Series::new("zones".into(), keys.iter().copied().collect::<Vec<i64>>());
            let origin_anchored = window
                .clone()
                .lazy()
                .filter(member_of(trip::ORIGIN, keys.clone()))
                .collect()?;
            let destination_anchored = window
                .clone()
                .lazy()
                .filter(member_of(trip::DESTINATION, keys))
                .collect()?;
            Ok(DirectionalSplit {
                origin_anchored,
                destination_anchored,
            })
        }
    }
}

/// `column` is one of `values`; false for no values.
fn member_of(column: &str, values: Series) -> Expr {
    if values.is_empty() {
        return lit(false);
    }
    col(column).is_in(lit(values).implode(), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TripRecord;

    fn record(origin: i64, destination: i64, mode: &str, period: i64, trips: f64) -> TripRecord {
        TripRecord {
            origin,
            destination,
            mode: mode.to_string(),
            period,
            trips,
        }
    }

    fn table() -> TripTable {
        TripTable::from_records(&[
            record(1, 2, mode::PRIVATE, 6, 10.0),
            record(2, 3, mode::PUBLIC_TRANSPORT, 7, 4.0),
            record(3, 1, mode::NON_MOTORIZED, 18, 2.0),
            record(1, 3, mode::PRIVATE, 22, 1.5),
            record(4, 4, "Bicicleta", 7, 9.0),
        ])
        .unwrap()
    }

    #[test]
    fn period_range_bounds() {
        assert!(PeriodRange::new(0, 23).is_ok());
        assert!(PeriodRange::new(7, 7).is_ok());
        assert!(matches!(
            PeriodRange::new(5, 3),
            Err(SurveyError::Range { lo: 5, hi: 3 })
        ));
        assert!(PeriodRange::new(-1, 3).is_err());
        assert!(PeriodRange::new(0, 24).is_err());
    }

    #[test]
    fn filter_state_rejects_reversed_range() {
        let err = FilterState::new(mode::ALL, (5, 3), []).unwrap_err();
        assert!(matches!(err, SurveyError::Range { lo: 5, hi: 3 }));
    }

    #[test]
    fn empty_zone_list_means_all_zones() {
        assert_eq!(ZoneSelection::from_keys([]), ZoneSelection::All);
        assert_eq!(
            ZoneSelection::from_keys([3, 1, 3]),
            ZoneSelection::Subset(BTreeSet::from([1, 3]))
        );
    }

    #[test]
    fn mode_filter_keeps_only_selected_modes() {
        let base = base_filtered(&table(), &Modes::new([mode::PRIVATE])).unwrap();
        assert_eq!(base.height(), 2);

        let base = base_filtered(&table(), &Modes::all()).unwrap();
        assert_eq!(base.height(), 4, "unrecognized modes only match when listed");

        let base = base_filtered(&table(), &Modes::new(["Bicicleta"])).unwrap();
        assert_eq!(base.height(), 1);
    }

    #[test]
    fn mode_selection_membership() {
        let modes = Modes::all();
        assert!(!modes.is_empty());
        assert!(modes.contains(mode::PUBLIC_TRANSPORT));
        assert!(!modes.contains("TP"));
        assert!(!modes.contains("Bicicleta"));
        assert!(Modes::default().is_empty());
    }

    #[test]
    fn empty_mode_selection_excludes_everything() {
        let base = base_filtered(&table(), &Modes::default()).unwrap();
        assert_eq!(base.height(), 0);
        assert_eq!(base.get_column_names_str(), trip::ALL.to_vec());
    }

    #[test]
    fn window_filter_is_inclusive() {
        let base = base_filtered(&table(), &Modes::all()).unwrap();
        let window = window_filtered(&base, PeriodRange::new(7, 18).unwrap()).unwrap();
        let mut hours: Vec<i64> = window
            .column(trip::PERIOD)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        hours.sort();
        assert_eq!(hours, vec![7, 18]);

        let range = PeriodRange::new(7, 18).unwrap();
        assert!(range.contains(7) && range.contains(18));
        assert!(!range.contains(6) && !range.contains(19));
        assert!(PeriodRange::full().contains(0) && PeriodRange::full().contains(23));
    }

    #[test]
    fn zone_subset_splits_by_direction() {
        let base = base_filtered(&table(), &Modes::all()).unwrap();
        let zones = ZoneSelection::from_keys([1]);
        let split = directional_split(&base, &zones).unwrap();

        assert_eq!(split.origin_anchored.height(), 2);
        assert_eq!(split.destination_anchored.height(), 1);
    }

    #[test]
    fn no_zone_selection_keeps_the_whole_window() {
        let base = base_filtered(&table(), &Modes::all()).unwrap();
        let split = directional_split(&base, &ZoneSelection::All).unwrap();

        assert!(split.origin_anchored.equals(&base));
        assert!(split.destination_anchored.equals(&base));
    }

    #[test]
    fn large_zone_selection_with_absent_zones() {
        // one trip per zone pair i -> i + 1 for 800 zones
        let records: Vec<TripRecord> = (0..800)
            .map(|i| record(i, i + 1, mode::PRIVATE, i % 24, 1.0))
            .collect();
        let table = TripTable::from_records(&records).unwrap();

        // 500 even keys, of which those >= 800 are absent from the data
        let state = FilterState::new(mode::ALL, (0, 23), (0..1000).step_by(2)).unwrap();
        let views = FilteredViews::build(&table, &state).unwrap();

        // even origins 0..798
        assert_eq!(views.split.origin_anchored.height(), 400);
        // even destinations 2..800
        assert_eq!(views.split.destination_anchored.height(), 400);
        let origins: Vec<i64> = views
            .split
            .origin_anchored
            .column(trip::ORIGIN)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert!(origins.iter().all(|o| o % 2 == 0));
    }

    #[test]
    fn selection_of_only_absent_zones_is_empty() {
        let state = FilterState::new(mode::ALL, (0, 23), [40, 41, 42]).unwrap();
        let views = FilteredViews::build(&table(), &state).unwrap();

        assert_eq!(views.window.height(), 4);
        assert_eq!(views.split.origin_anchored.height(), 0);
        assert_eq!(views.split.destination_anchored.height(), 0);
    }

    #[test]
    fn views_compose_all_three_filters() {
        let state = FilterState::new([mode::PRIVATE], (0, 12), [2]).unwrap();
        let views = FilteredViews::build(&table(), &state).unwrap();

        assert_eq!(views.base.height(), 2);
        assert_eq!(views.window.height(), 1);
        assert_eq!(views.split.origin_anchored.height(), 0);
        assert_eq!(views.split.destination_anchored.height(), 1);
    }
}
