//! In-memory store of country records with region-indexed queries.
//!
//! Two join policies live side by side here and are intentionally not unified:
//!
//! - [`DataStore::aggregate`] is a **strict join**: a country is admitted only
//!   when population and every requested indicator cover every requested year.
//! - [`DataStore::query_pairs`] is a **best-effort join**: each year of each
//!   country contributes a point whenever both indicators have a value for it.
//!
//! ```no_run
//! use geostat::{DataStore, GeoRegistry, RegionType};
//!
//! let registry = GeoRegistry::from_json_file("data/country_by_region.json")?;
//! let mut store = DataStore::new(registry, "data/population.csv", "population")?;
//! store.load("data/gdp_per_capita.csv", "gdp per capita")?;
//!
//! let frame = store.aggregate(&[2000, 2010], &["gdp per capita"], RegionType::Region, None)?;
//! let points = store.query_pairs(&[2000, 2010], "gdp per capita", "population", Some("Asia"))?;
//! # let _ = (frame, points);
//! # Ok::<(), geostat::GeoStatError>(())
//! ```

use crate::config::RescaleConfig;
use crate::error::{GeoStatError, Result};
use crate::geo::GeoRegistry;
use crate::models::{CountryRecord, DataPoint, POPULATION, RegionType};
use crate::storage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Field names that carry labels rather than indicator values.
pub const NAME_FIELD: &str = "name";
pub const REGION_FIELD: &str = "region";

/// Outcome of one [`DataStore::load`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub indicator: String,
    /// Data rows read from the file.
    pub rows: usize,
    /// Rows merged into a country record.
    pub admitted: usize,
    /// Country records created by this load.
    pub created: usize,
    /// Rows whose code the geographic registry does not know.
    pub unknown_codes: usize,
    /// Rows too short or unreadable to carry a country code.
    pub malformed_rows: usize,
    /// Individual cells that did not parse as a finite number.
    pub skipped_cells: usize,
}

/// Columns for one year of an aggregate, aligned by admitted-country order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearFrame {
    pub name: Vec<String>,
    pub region: Vec<String>,
    /// Rescaled population, see [`RescaleConfig`].
    pub population: Vec<f64>,
    #[serde(flatten)]
    pub indicators: BTreeMap<String, Vec<f64>>,
}

impl YearFrame {
    fn keyed(indicators: &[&str]) -> Self {
        Self {
            indicators: indicators
                .iter()
                .map(|&ind| (ind.to_string(), Vec::new()))
                .collect(),
            ..Default::default()
        }
    }

    /// Number of admitted countries.
    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Values of a numeric field; `population` is the rescaled column.
    pub fn values(&self, field: &str) -> Option<&[f64]> {
        if field == POPULATION {
            return Some(&self.population);
        }
        self.indicators.get(field).map(Vec::as_slice)
    }
}

/// Result of [`DataStore::aggregate`]: one [`YearFrame`] per requested year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateFrame {
    pub years: BTreeMap<i32, YearFrame>,
}

impl AggregateFrame {
    pub fn get(&self, year: i32) -> Option<&YearFrame> {
        self.years.get(&year)
    }
}

/// Owns the country records, the registry they are classified by and the set
/// of indicators loaded so far.
#[derive(Debug, Clone)]
pub struct DataStore {
    registry: GeoRegistry,
    countries: BTreeMap<String, CountryRecord>,
    indicators: BTreeSet<String>,
    rescale: RescaleConfig,
}

impl DataStore {
    /// Build a store and load its mandatory first indicator file, which
    /// populates the country set.
    pub fn new<P: AsRef<Path>>(
        registry: GeoRegistry,
        bootstrap_path: P,
        bootstrap_indicator: &str,
    ) -> Result<Self> {
        Self::with_rescale(
            registry,
            RescaleConfig::default(),
            bootstrap_path,
            bootstrap_indicator,
        )
    }

    pub fn with_rescale<P: AsRef<Path>>(
        registry: GeoRegistry,
        rescale: RescaleConfig,
        bootstrap_path: P,
        bootstrap_indicator: &str,
    ) -> Result<Self> {
        rescale.validate()?;
        let mut store = Self {
            registry,
            countries: BTreeMap::new(),
            indicators: BTreeSet::new(),
            rescale,
        };
        store.load(bootstrap_path, bootstrap_indicator)?;
        Ok(store)
    }

    /// Load a canonical indicator CSV and merge it under `indicator_id`.
    ///
    /// Rows with a code unknown to the registry are dropped; unparsable cells
    /// are skipped one by one. Only a missing or unreadable file fails the load.
    pub fn load<P: AsRef<Path>>(&mut self, path: P, indicator_id: &str) -> Result<LoadReport> {
        let indicator_id = indicator_id.trim();
        if indicator_id.is_empty() {
            return Err(GeoStatError::InvalidQuery("empty indicator id".into()));
        }
        let path = path.as_ref();
        let parsed = storage::read_indicator_csv(path)?;

        let mut report = LoadReport {
            indicator: indicator_id.to_string(),
            rows: parsed.rows.len() + parsed.malformed_rows,
            malformed_rows: parsed.malformed_rows,
            ..Default::default()
        };

        for row in parsed.rows {
            report.skipped_cells += row.skipped_cells;
            let Some(cls) = self.registry.classification(&row.code) else {
                log::debug!("{}: dropping row for unknown code '{}'", path.display(), row.code);
                report.unknown_codes += 1;
                continue;
            };
            if !self.countries.contains_key(&row.code) {
                let name = if row.name.is_empty() {
                    self.registry.name(&row.code).unwrap_or_default()
                } else {
                    row.name.as_str()
                };
                let record = match CountryRecord::new(name, &row.code, cls.clone()) {
                    Ok(record) => record,
                    Err(e) => {
                        log::debug!("{}: skipping row: {}", path.display(), e);
                        report.malformed_rows += 1;
                        continue;
                    }
                };
                self.countries.insert(row.code.clone(), record);
                report.created += 1;
            }
            if let Some(record) = self.countries.get_mut(&row.code) {
                record.merge_series(indicator_id, &row.values);
                report.admitted += 1;
            }
        }

        if report.admitted == 0 {
            log::warn!("{}: no rows matched a known country code", path.display());
        }
        log::info!(
            "loaded '{}' from {}: {} rows, {} admitted, {} unknown codes, {} skipped cells",
            indicator_id,
            path.display(),
            report.rows,
            report.admitted,
            report.unknown_codes,
            report.skipped_cells
        );
        self.indicators.insert(indicator_id.to_string());
        Ok(report)
    }

    /// Strict-join aggregate of `population` plus `indicators` over `years`,
    /// grouped by the regions of `region_type`.
    ///
    /// `regions` defaults to every region of the type. A country lacking any
    /// requested value for any requested year is left out entirely.
    ///
    /// ### Errors
    /// - `NoDataAvailable` when no country is admitted for the earliest year
    /// - `UnknownRegion` for a region name the registry does not know
    /// - `InvalidQuery` for an empty or reserved indicator name
    pub fn aggregate(
        &self,
        years: &[i32],
        indicators: &[&str],
        region_type: RegionType,
        regions: Option<&[&str]>,
    ) -> Result<AggregateFrame> {
        let years = normalize_years(years);
        let Some(&earliest) = years.first() else {
            return Err(GeoStatError::InvalidQuery("no years requested".into()));
        };
        let requested = requested_indicators(indicators)?;

        let region_map = self.registry.regions(region_type);
        let selected: BTreeSet<&str> = match regions {
            Some(names) => names.iter().copied().collect(),
            None => region_map.keys().map(String::as_str).collect(),
        };

        let mut frame = AggregateFrame {
            years: years
                .iter()
                .map(|&y| (y, YearFrame::keyed(&requested)))
                .collect(),
        };

        for region in selected {
            let codes = region_map
                .get(region)
                .ok_or_else(|| GeoStatError::UnknownRegion {
                    region_type: region_type.to_string(),
                    name: region.to_string(),
                })?;
            for record in codes.iter().filter_map(|c| self.countries.get(c)) {
                self.admit(&mut frame, &years, &requested, region_type, record);
            }
        }

        if frame.get(earliest).is_none_or(YearFrame::is_empty) {
            return Err(GeoStatError::NoDataAvailable { year: earliest });
        }
        Ok(frame)
    }

    fn admit(
        &self,
        frame: &mut AggregateFrame,
        years: &[i32],
        requested: &[&str],
        region_type: RegionType,
        record: &CountryRecord,
    ) {
        let population = record.values_for_years(years, POPULATION);
        if population.is_empty() {
            return;
        }
        let mut columns = Vec::with_capacity(requested.len());
        for &ind in requested {
            let values = record.values_for_years(years, ind);
            if values.is_empty() {
                return;
            }
            columns.push(values);
        }

        let label = record.region(region_type);
        for (i, year) in years.iter().enumerate() {
            let Some(yf) = frame.years.get_mut(year) else {
                continue;
            };
            yf.name.push(record.name().to_string());
            yf.region.push(label.to_string());
            yf.population.push(self.rescale.rescale(population[i]));
            for (ind, values) in requested.iter().zip(&columns) {
                if let Some(col) = yf.indicators.get_mut(*ind) {
                    col.push(values[i]);
                }
            }
        }
    }

    /// Best-effort union of `(a, b)` pairs over all countries, or over the
    /// countries of one region, sub-region or intermediate region.
    ///
    /// A region name matching nothing yields an empty list.
    pub fn query_pairs(
        &self,
        years: &[i32],
        indicator_a: &str,
        indicator_b: &str,
        region: Option<&str>,
    ) -> Result<Vec<DataPoint>> {
        if indicator_a == indicator_b {
            return Err(GeoStatError::SameIndicator(indicator_a.to_string()));
        }
        let mut points = Vec::new();
        match region {
            None => {
                for record in self.countries.values() {
                    points.extend(record.paired_values(years, indicator_a, indicator_b)?);
                }
            }
            Some(name) => {
                let codes = RegionType::ALL
                    .iter()
                    .find_map(|&t| self.registry.codes_in(t, name).filter(|_| !name.is_empty()));
                for record in codes.into_iter().flatten().filter_map(|c| self.countries.get(c)) {
                    points.extend(record.paired_values(years, indicator_a, indicator_b)?);
                }
            }
        }
        Ok(points)
    }

    pub fn indicator_ids(&self) -> BTreeSet<String> {
        self.indicators.clone()
    }

    pub fn region_names(&self) -> Vec<String> {
        self.registry.region_names(RegionType::Region)
    }

    pub fn subregion_names(&self) -> Vec<String> {
        self.registry.region_names(RegionType::SubRegion)
    }

    pub fn intermediate_region_names(&self) -> Vec<String> {
        self.registry.region_names(RegionType::IntermediateRegion)
    }

    /// `(name, code)` of every loaded country, sorted by name.
    pub fn country_names(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .countries
            .values()
            .map(|c| (c.name().to_string(), c.code().to_string()))
            .collect();
        out.sort();
        out
    }

    pub fn country(&self, code: &str) -> Option<&CountryRecord> {
        self.countries.get(code)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn registry(&self) -> &GeoRegistry {
        &self.registry
    }

    pub fn rescale(&self) -> &RescaleConfig {
        &self.rescale
    }
}

fn normalize_years(years: &[i32]) -> Vec<i32> {
    let mut ys = years.to_vec();
    ys.sort_unstable();
    ys.dedup();
    ys
}

/// Requested indicators in caller order, deduplicated and without the
/// implicit population field.
fn requested_indicators<'a>(indicators: &[&'a str]) -> Result<Vec<&'a str>> {
    let mut out: Vec<&str> = Vec::with_capacity(indicators.len());
    for &ind in indicators {
        if ind.trim().is_empty() || ind == NAME_FIELD || ind == REGION_FIELD {
            return Err(GeoStatError::InvalidQuery(format!(
                "'{ind}' is not a valid indicator id"
            )));
        }
        if ind != POPULATION && !out.contains(&ind) {
            out.push(ind);
        }
    }
    Ok(out)
}
