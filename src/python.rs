use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::config::SurveyConfig;
use crate::filter::FilterState;
use crate::pipeline::SurveyPipeline;
use crate::schema;

/// Loaded OD survey, exposed to a Python dashboard.
#[pyclass(name = "OdSurvey", frozen)]
pub struct PyOdSurvey {
    pipeline: SurveyPipeline,
}

#[pymethods]
impl PyOdSurvey {
    /// Load partitions and zone boundaries named by a TOML config file.
    #[new]
    fn new(config_path: &str) -> PyResult<Self> {
        let config = SurveyConfig::from_file(config_path)?;
        let pipeline = SurveyPipeline::load(&config)?;
        Ok(Self { pipeline })
    }

    /// Aggregate trips for one filter state.
    ///
    /// Returns `(hourly, generation, attraction)` DataFrames. An empty `zones`
    /// list (or None) applies no spatial restriction.
    #[pyo3(signature = (modes, period_range=(0, 23), zones=None))]
    fn explore(
        &self,
        modes: Vec<String>,
        period_range: (i64, i64),
        zones: Option<Vec<i64>>,
    ) -> PyResult<(PyDataFrame, PyDataFrame, PyDataFrame)> {
        let state = FilterState::new(modes, period_range, zones.unwrap_or_default())?;
        let exploration = self.pipeline.explore(&state)?;

        Ok((
            PyDataFrame(exploration.hourly.into_frame()),
            PyDataFrame(exploration.generation.into_frame()),
            PyDataFrame(exploration.attraction.into_frame()),
        ))
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn trips_df(&self) -> PyDataFrame {
        PyDataFrame(self.pipeline.trips().frame().clone())
    }

    #[getter]
    fn zone_keys(&self) -> Vec<i64> {
        self.pipeline.zones().keys().collect()
    }

    #[getter]
    fn zone_choices(&self) -> PyResult<Vec<i64>> {
        Ok(self.pipeline.trips().zone_choices()?)
    }
}

/// Export schema constants as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let columns = PyModule::new(m.py(), "columns")?;
    columns.add("ORIGIN", schema::trip::ORIGIN)?;
    columns.add("DESTINATION", schema::trip::DESTINATION)?;
    columns.add("MODE", schema::trip::MODE)?;
    columns.add("PERIOD", schema::trip::PERIOD)?;
    columns.add("TRIPS", schema::trip::TRIPS)?;
    m.add_submodule(&columns)?;

    let modes = PyModule::new(m.py(), "modes")?;
    modes.add("PRIVATE", schema::mode::PRIVATE)?;
    modes.add("PUBLIC_TRANSPORT", schema::mode::PUBLIC_TRANSPORT)?;
    modes.add("NON_MOTORIZED", schema::mode::NON_MOTORIZED)?;
    modes.add("ALL", schema::mode::ALL.to_vec())?;
    m.add_submodule(&modes)?;

    Ok(())
}

#[pymodule]
fn od_survey(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyOdSurvey>()?;
    add_schema_exports(m)?;
    Ok(())
}
