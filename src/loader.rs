use std::collections::BTreeSet;
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::SurveyConfig;
use crate::error::SurveyError;
use crate::schema::{mode, period, source, trip};

/// How partition files are laid out on disk.
#[derive(Debug, Clone, Copy)]
pub struct CsvFormat {
    pub delimiter: u8,
    /// Drop the first column as a synthetic row index.
    pub row_index: bool,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            row_index: true,
        }
    }
}

impl CsvFormat {
    pub fn from_config(config: &SurveyConfig) -> Result<Self, SurveyError> {
        Ok(Self {
            delimiter: config.delimiter_byte()?,
            row_index: config.csv.row_index,
        })
    }
}

/// One row of the unified trip table.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub origin: i64,
    pub destination: i64,
    pub mode: String,
    pub period: i64,
    pub trips: f64,
}

/// The unified, normalized trip table. Immutable once loaded.
///
/// Columns: origin (Int64), destination (Int64), mode (String),
/// period (Int64, 0..=23), trips (Float64, >= 0).
#[derive(Debug, Clone)]
pub struct TripTable {
    frame: DataFrame,
    source_rows: usize,
    professional_rows: usize,
}

impl TripTable {
    /// Build a table directly from typed records, enforcing the same
    /// invariants as loading.
    pub fn from_records(records: &[TripRecord]) -> Result<Self, SurveyError> {
        for r in records {
            check_hour(r.period, &r.period.to_string())?;
            check_trips(r.trips, &r.trips.to_string())?;
        }

        let frame = DataFrame::new(vec![
            Column::new(
                trip::ORIGIN.into(),
                records.iter().map(|r| r.origin).collect::<Vec<i64>>(),
            ),
            Column::new(
                trip::DESTINATION.into(),
                records.iter().map(|r| r.destination).collect::<Vec<i64>>(),
            ),
            Column::new(
                trip::MODE.into(),
                records.iter().map(|r| r.mode.clone()).collect::<Vec<String>>(),
            ),
            Column::new(
                trip::PERIOD.into(),
                records.iter().map(|r| r.period).collect::<Vec<i64>>(),
            ),
            Column::new(
                trip::TRIPS.into(),
                records.iter().map(|r| r.trips).collect::<Vec<f64>>(),
            ),
        ])?;

        Ok(Self {
            frame,
            source_rows: records.len(),
            professional_rows: 0,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Rows read from all partitions, before professional trips were removed.
    pub fn source_rows(&self) -> usize {
        self.source_rows
    }

    /// Rows removed because they were flagged as professional trips.
    pub fn professional_rows(&self) -> usize {
        self.professional_rows
    }

    /// Distinct zone keys appearing in `column` (origin or destination).
    pub fn zones_in(&self, column: &str) -> Result<BTreeSet<i64>, SurveyError> {
        Ok(self.frame.column(column)?.i64()?.into_iter().flatten().collect())
    }

    /// Zones offered for selection: every distinct origin, ascending.
    pub fn zone_choices(&self) -> Result<Vec<i64>, SurveyError> {
        Ok(self.zones_in(trip::ORIGIN)?.into_iter().collect())
    }

    pub fn records(&self) -> Result<Vec<TripRecord>, SurveyError> {
        let origins = self.frame.column(trip::ORIGIN)?.i64()?;
        let destinations = self.frame.column(trip::DESTINATION)?.i64()?;
        let modes = self.frame.column(trip::MODE)?.str()?;
        let periods = self.frame.column(trip::PERIOD)?.i64()?;
        let trips = self.frame.column(trip::TRIPS)?.f64()?;

        Ok(origins
            .into_iter()
            .zip(destinations)
            .zip(modes)
            .zip(periods)
            .zip(trips)
            .map(|((((o, d), m), p), t)| TripRecord {
                origin: o.unwrap_or_default(),
                destination: d.unwrap_or_default(),
                mode: m.unwrap_or_default().to_string(),
                period: p.unwrap_or_default(),
                trips: t.unwrap_or_default(),
            })
            .collect())
    }
}

// ── Loading ─────────────────────────────────────────────────────────────────

/// Load the partitions named by a survey config.
pub fn load_trips(config: &SurveyConfig) -> Result<TripTable, SurveyError> {
    let format = CsvFormat::from_config(config)?;
    load_partitions(&config.partition_paths(), format)
}

/// Read every partition, concatenate them in order and normalize the result.
///
/// Normalization runs once, in this order:
///   1. drop professional trips, then the `profesional` and `residencia` columns
///   2. parse `P<hour>` period tags into integer hours
///   3. expand the public-transport abbreviation to its full label
///
/// Any missing or malformed partition aborts the whole load.
pub fn load_partitions<P: AsRef<Path>>(
    paths: &[P],
    format: CsvFormat,
) -> Result<TripTable, SurveyError> {
    let mut unified: Option<DataFrame> = None;

    for path in paths {
        let path = path.as_ref();
        let partition = read_partition(path, format)?;
        info!(path = %path.display(), rows = partition.height(), "loaded survey partition");

        match unified.as_mut() {
            Some(df) => {
                df.vstack_mut(&partition)
                    .map_err(|e| SurveyError::load(path, e))?;
            }
            None => unified = Some(partition),
        }
    }

    let raw = unified
        .ok_or_else(|| SurveyError::Config("no partition files given".to_string()))?;
    let source_rows = raw.height();

    let (df, professional_rows) = drop_professional(raw)?;
    let df = parse_periods(df)?;
    let frame = into_trip_frame(df)?;

    info!(
        partitions = paths.len(),
        source_rows,
        professional_rows,
        rows = frame.height(),
        "unified trip table ready"
    );

    Ok(TripTable {
        frame,
        source_rows,
        professional_rows,
    })
}

/// Read one partition with every column as String and check it against the
/// declared schema. Returns the declared columns in declared order.
fn read_partition(path: &Path, format: CsvFormat) -> Result<DataFrame, SurveyError> {
    if !path.is_file() {
        return Err(SurveyError::load(path, "file not found"));
    }

    let delimiter = format.delimiter;
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .map_parse_options(move |opts| opts.with_separator(delimiter))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| SurveyError::load(path, e))?;

    // Trim whitespace from column names
    let names: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(names.iter().map(String::as_str))
        .map_err(|e| SurveyError::load(path, e))?;

    let data_columns: &[String] = if format.row_index {
        names.get(1..).unwrap_or_default()
    } else {
        &names
    };

    let missing: Vec<&str> = source::ALL
        .iter()
        .copied()
        .filter(|c| !data_columns.iter().any(|d| d == c))
        .collect();
    let unexpected: Vec<&str> = data_columns
        .iter()
        .map(String::as_str)
        .filter(|d| !source::ALL.contains(d))
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(SurveyError::load(
            path,
            format!(
                "schema mismatch (missing: [{}], unexpected: [{}])",
                missing.join(", "),
                unexpected.join(", ")
            ),
        ));
    }

    df.select(source::ALL)
        .map_err(|e| SurveyError::load(path, e))
}

// ── Normalization ───────────────────────────────────────────────────────────

/// Decode the professional flag. `None` for anything but yes/no.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "no" => Some(false),
        "si" | "sí" => Some(true),
        _ => None,
    }
}

/// Parse a period tag such as `P7` into its hour.
pub fn parse_period(tag: &str) -> Result<i64, SurveyError> {
    let tag = tag.trim();
    let mut chars = tag.chars();
    let hour = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.as_str(),
        _ => {
            return Err(SurveyError::parse(
                source::PERIOD,
                tag,
                "expected a letter tag followed by an hour",
            ))
        }
    };

    if hour.is_empty() || !hour.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SurveyError::parse(
            source::PERIOD,
            tag,
            "hour must be unsigned digits",
        ));
    }
    let hour: i64 = hour
        .parse()
        .map_err(|_| SurveyError::parse(source::PERIOD, tag, "hour is not an integer"))?;
    check_hour(hour, tag)?;
    Ok(hour)
}

fn check_hour(hour: i64, raw: &str) -> Result<(), SurveyError> {
    if (period::MIN_HOUR..=period::MAX_HOUR).contains(&hour) {
        Ok(())
    } else {
        Err(SurveyError::parse(
            source::PERIOD,
            raw,
            format!(
                "hour must be within [{}, {}]",
                period::MIN_HOUR,
                period::MAX_HOUR
            ),
        ))
    }
}

fn check_trips(trips: f64, raw: &str) -> Result<(), SurveyError> {
    if trips.is_finite() && trips >= 0.0 {
        Ok(())
    } else {
        Err(SurveyError::parse(
            source::TRIPS,
            raw,
            "trip counts must be finite and non-negative",
        ))
    }
}

fn drop_professional(df: DataFrame) -> Result<(DataFrame, usize), SurveyError> {
    let keep = df
        .column(source::PROFESSIONAL)?
        .str()?
        .into_iter()
        .map(|raw| match raw.and_then(parse_flag) {
            Some(is_professional) => Ok(!is_professional),
            None => Err(SurveyError::parse(
                source::PROFESSIONAL,
                raw.unwrap_or_default(),
                "expected 'Si' or 'No'",
            )),
        })
        .collect::<Result<BooleanChunked, _>>()?;

    let kept = df.filter(&keep)?.select([
        source::ORIGIN,
        source::DESTINATION,
        source::MODE,
        source::PERIOD,
        source::TRIPS,
    ])?;
    let dropped = df.height() - kept.height();
    debug!(dropped, "removed professional trips");

    Ok((kept, dropped))
}

fn parse_periods(mut df: DataFrame) -> Result<DataFrame, SurveyError> {
    let hours = df
        .column(source::PERIOD)?
        .str()?
        .into_iter()
        .map(|raw| parse_period(raw.unwrap_or_default()))
        .collect::<Result<Vec<i64>, _>>()?;

    df.with_column(Column::new(source::PERIOD.into(), hours))?;
    Ok(df)
}

/// Mode with the public-transport abbreviation expanded; other values pass
/// through unchanged.
fn canonical_mode() -> Expr {
    when(col(source::MODE).eq(lit(mode::PUBLIC_TRANSPORT_ABBREV)))
        .then(lit(mode::PUBLIC_TRANSPORT))
        .otherwise(col(source::MODE))
}

fn numeric(column: &str, dtype: DataType) -> Expr {
    col(column)
        .str()
        .strip_chars(lit(" \t\r\n"))
        .cast(dtype)
}

/// Type and rename the remaining source columns into the unified schema.
fn into_trip_frame(df: DataFrame) -> Result<DataFrame, SurveyError> {
    let typed = df
        .clone()
        .lazy()
        .select([
            numeric(source::ORIGIN, DataType::Int64).alias(trip::ORIGIN),
            numeric(source::DESTINATION, DataType::Int64).alias(trip::DESTINATION),
            canonical_mode().alias(trip::MODE),
            col(source::PERIOD).alias(trip::PERIOD),
            numeric(source::TRIPS, DataType::Float64).alias(trip::TRIPS),
        ])
        .collect()?;

    for (raw_name, name, expected) in [
        (source::ORIGIN, trip::ORIGIN, "an integer zone key"),
        (source::DESTINATION, trip::DESTINATION, "an integer zone key"),
        (source::MODE, trip::MODE, "a mode label"),
        (source::TRIPS, trip::TRIPS, "a number"),
    ] {
        ensure_parsed(&df, raw_name, &typed, name, expected)?;
    }

    let invalid_trips = typed
        .column(trip::TRIPS)?
        .f64()?
        .into_iter()
        .enumerate()
        .find_map(|(i, t)| t.filter(|t| check_trips(*t, "").is_err()).map(|t| (i, t)));
    if let Some((i, t)) = invalid_trips {
        let raw = df.column(source::TRIPS)?.str()?.get(i).map(str::to_string);
        check_trips(t, &raw.unwrap_or_else(|| t.to_string()))?;
    }

    let unknown_modes = typed
        .column(trip::MODE)?
        .str()?
        .into_iter()
        .flatten()
        .filter(|m| !mode::ALL.contains(m))
        .count();
    if unknown_modes > 0 {
        warn!(
            rows = unknown_modes,
            "trip rows carry a mode outside the canonical labels; kept as-is"
        );
    }

    Ok(typed)
}

/// Fail on the first value that the cast turned into null.
fn ensure_parsed(
    raw: &DataFrame,
    raw_name: &str,
    typed: &DataFrame,
    name: &str,
    expected: &str,
) -> Result<(), SurveyError> {
    let parsed = typed.column(name)?;
    let null_count = parsed.null_count();
    if null_count == 0 {
        return Ok(());
    }

    let offending = (0..parsed.len())
        .find(|&i| parsed.get(i).map(|v| v.is_null()).unwrap_or(false));
    let value = offending
        .and_then(|i| raw.column(raw_name).ok()?.str().ok()?.get(i))
        .unwrap_or_default()
        .to_string();

    Err(SurveyError::parse(
        raw_name,
        value,
        format!("{null_count} value(s) are missing or not {expected}"),
    ))
}
