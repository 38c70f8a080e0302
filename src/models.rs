use crate::error::{GeoStatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Indicator that every aggregate query carries implicitly.
pub const POPULATION: &str = "population";

/// One of the three nested geographic classification schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionType {
    Region,
    SubRegion,
    IntermediateRegion,
}

impl RegionType {
    pub const ALL: [RegionType; 3] = [
        RegionType::Region,
        RegionType::SubRegion,
        RegionType::IntermediateRegion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegionType::Region => "region",
            RegionType::SubRegion => "sub-region",
            RegionType::IntermediateRegion => "intermediate-region",
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "region" => Ok(RegionType::Region),
            "sub-region" | "subregion" => Ok(RegionType::SubRegion),
            "intermediate-region" | "int-region" => Ok(RegionType::IntermediateRegion),
            other => Err(format!("unknown region type: {other}")),
        }
    }
}

/// Region labels of a country under each [`RegionType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub region: String,
    pub sub_region: String,
    /// Empty for countries the reference file does not place in one.
    pub intermediate_region: String,
}

impl Classification {
    pub fn get(&self, region_type: RegionType) -> &str {
        match region_type {
            RegionType::Region => &self.region,
            RegionType::SubRegion => &self.sub_region,
            RegionType::IntermediateRegion => &self.intermediate_region,
        }
    }
}

/// Year → value observations of one indicator for one country.
///
/// Never empty once stored in a [`CountryRecord`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    values: BTreeMap<i32, f64>,
}

impl IndicatorSeries {
    pub fn get(&self, year: i32) -> Option<f64> {
        self.values.get(&year).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.values.keys().copied()
    }

    fn merge(&mut self, year_values: &BTreeMap<i32, f64>) {
        for (&year, &value) in year_values {
            self.values.insert(year, value);
        }
    }
}

/// Per-country container of indicator time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    name: String,
    code: String,
    classification: Classification,
    series: BTreeMap<String, IndicatorSeries>,
}

impl CountryRecord {
    pub fn new(name: &str, code: &str, classification: Classification) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(GeoStatError::InvalidRecord(format!("empty name for code '{code}'")));
        }
        if code.trim().is_empty() {
            return Err(GeoStatError::InvalidRecord(format!("empty code for '{name}'")));
        }
        if classification.region.is_empty() || classification.sub_region.is_empty() {
            return Err(GeoStatError::InvalidRecord(format!(
                "{code} has no region or sub-region"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            code: code.to_string(),
            classification,
            series: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn region(&self, region_type: RegionType) -> &str {
        self.classification.get(region_type)
    }

    pub fn series(&self, indicator: &str) -> Option<&IndicatorSeries> {
        self.series.get(indicator)
    }

    /// Add observations for `indicator`, overwriting years already present.
    pub fn merge_series(&mut self, indicator: &str, year_values: &BTreeMap<i32, f64>) {
        if year_values.is_empty() {
            return;
        }
        self.series
            .entry(indicator.to_string())
            .or_default()
            .merge(year_values);
    }

    /// Values of `indicator` in the order of `years`.
    ///
    /// All-or-nothing: returns an empty vector when the indicator is unknown or
    /// any single year is missing.
    pub fn values_for_years(&self, years: &[i32], indicator: &str) -> Vec<f64> {
        let Some(series) = self.series.get(indicator) else {
            return Vec::new();
        };
        years
            .iter()
            .map(|&y| series.get(y))
            .collect::<Option<Vec<f64>>>()
            .unwrap_or_default()
    }

    /// `(a, b)` pairs for each year in `years` that both series cover.
    pub fn paired_values(
        &self,
        years: &[i32],
        indicator_a: &str,
        indicator_b: &str,
    ) -> Result<Vec<DataPoint>> {
        if indicator_a == indicator_b {
            return Err(GeoStatError::SameIndicator(indicator_a.to_string()));
        }
        let (Some(a), Some(b)) = (self.series.get(indicator_a), self.series.get(indicator_b))
        else {
            return Ok(Vec::new());
        };
        Ok(years
            .iter()
            .filter_map(|&y| Some(DataPoint::new(a.get(y)?, b.get(y)?)))
            .collect())
    }

    pub fn indicator_ids(&self) -> BTreeSet<String> {
        self.series.keys().cloned().collect()
    }
}

/// Transient `(x, y)` pair fed to the regression functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

impl DataPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for DataPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CountryRecord {
        let mut c = CountryRecord::new(
            "Japan",
            "JPN",
            Classification {
                region: "Asia".into(),
                sub_region: "Eastern Asia".into(),
                intermediate_region: String::new(),
            },
        )
        .unwrap();
        c.merge_series("gdp", &BTreeMap::from([(2000, 1.0), (2001, 2.0), (2002, 3.0)]));
        c.merge_series("population", &BTreeMap::from([(2001, 10.0), (2002, 20.0)]));
        c
    }

    #[test]
    fn values_for_years_is_all_or_nothing() {
        let c = record();
        assert_eq!(c.values_for_years(&[2002, 2000], "gdp"), vec![3.0, 1.0]);
        assert!(c.values_for_years(&[2000, 2001], "population").is_empty());
        assert!(c.values_for_years(&[2000], "hdi").is_empty());
    }

    #[test]
    fn paired_values_keeps_years_covered_by_both() {
        let c = record();
        let pts = c.paired_values(&[2000, 2001, 2002, 2003], "gdp", "population").unwrap();
        assert_eq!(pts, vec![DataPoint::new(2.0, 10.0), DataPoint::new(3.0, 20.0)]);
        assert!(matches!(
            c.paired_values(&[2000], "gdp", "gdp"),
            Err(GeoStatError::SameIndicator(_))
        ));
    }

    #[test]
    fn merge_overwrites_same_year() {
        let mut c = record();
        c.merge_series("gdp", &BTreeMap::from([(2001, 5.0), (2003, 4.0)]));
        assert_eq!(c.series("gdp").unwrap().len(), 4);
        assert_eq!(c.values_for_years(&[2001, 2003], "gdp"), vec![5.0, 4.0]);
    }

    #[test]
    fn empty_merge_creates_no_series() {
        let mut c = record();
        c.merge_series("hdi", &BTreeMap::new());
        assert!(!c.indicator_ids().contains("hdi"));
    }

    #[test]
    fn record_rejects_missing_identity() {
        let cls = Classification {
            region: "Asia".into(),
            sub_region: String::new(),
            intermediate_region: String::new(),
        };
        assert!(CountryRecord::new("Japan", "JPN", cls.clone()).is_err());
        assert!(CountryRecord::new("", "JPN", cls).is_err());
    }

    #[test]
    fn region_type_parses_aliases() {
        assert_eq!("int-region".parse::<RegionType>(), Ok(RegionType::IntermediateRegion));
        assert_eq!("Sub-Region".parse::<RegionType>(), Ok(RegionType::SubRegion));
        assert!("continent".parse::<RegionType>().is_err());
    }
}
