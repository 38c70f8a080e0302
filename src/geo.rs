//! Geographic reference data: ISO3 code → name and nested region labels.
//!
//! The reference file is a JSON array in the layout of the ISO-3166 "all"
//! country list:
//!
//! ```json
//! [{"name": "Japan", "alpha-3": "JPN", "region": "Asia",
//!   "sub-region": "Eastern Asia", "intermediate-region": ""}]
//! ```
//!
//! Extra keys are ignored. Entries without a region or sub-region (e.g.
//! Antarctica) cannot be classified and are left out of the registry.

use crate::error::{GeoStatError, Result};
use crate::models::{Classification, RegionType};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One entry of the geographic reference file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEntry {
    #[serde(rename = "alpha-3")]
    pub alpha3: String,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(rename = "sub-region", default)]
    pub sub_region: String,
    #[serde(rename = "intermediate-region", default)]
    pub intermediate_region: String,
}

/// Region type → region name → country codes. Names iterate alphabetically.
pub type RegionIndex = BTreeMap<RegionType, BTreeMap<String, BTreeSet<String>>>;

/// Immutable lookup of country classifications, built once and handed to
/// [`crate::store::DataStore`].
#[derive(Debug, Clone, Default)]
pub struct GeoRegistry {
    countries: AHashMap<String, (String, Classification)>,
    index: RegionIndex,
}

impl GeoRegistry {
    /// Read the reference JSON at `path`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GeoStatError::MissingFile(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let entries: Vec<GeoEntry> = serde_json::from_reader(reader)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = GeoEntry>) -> Self {
        let mut countries = AHashMap::new();
        let mut index: RegionIndex = RegionType::ALL
            .iter()
            .map(|&t| (t, BTreeMap::new()))
            .collect();

        for e in entries {
            let code = e.alpha3.trim().to_string();
            if code.is_empty() || e.region.is_empty() || e.sub_region.is_empty() {
                log::debug!("geo registry: skipping unclassified entry '{}'", e.name);
                continue;
            }
            let cls = Classification {
                region: e.region,
                sub_region: e.sub_region,
                intermediate_region: e.intermediate_region,
            };
            for t in RegionType::ALL {
                index
                    .entry(t)
                    .or_default()
                    .entry(cls.get(t).to_string())
                    .or_default()
                    .insert(code.clone());
            }
            countries.insert(code, (e.name, cls));
        }

        log::debug!("geo registry: {} countries classified", countries.len());
        Self { countries, index }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.countries.contains_key(code)
    }

    pub fn classification(&self, code: &str) -> Option<&Classification> {
        self.countries.get(code).map(|(_, cls)| cls)
    }

    /// Reference name of a country, which may differ from the name used in
    /// indicator files.
    pub fn name(&self, code: &str) -> Option<&str> {
        self.countries.get(code).map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Region name → codes for one region type.
    pub fn regions(&self, region_type: RegionType) -> &BTreeMap<String, BTreeSet<String>> {
        static EMPTY: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        self.index.get(&region_type).unwrap_or(&EMPTY)
    }

    /// Codes of `name` under `region_type`, if such a region exists.
    pub fn codes_in(&self, region_type: RegionType, name: &str) -> Option<&BTreeSet<String>> {
        self.index.get(&region_type)?.get(name)
    }

    /// Sorted region names of `region_type`, without the empty label.
    pub fn region_names(&self, region_type: RegionType) -> Vec<String> {
        self.regions(region_type)
            .keys()
            .filter(|n| !n.is_empty())
            .cloned()
            .collect()
    }
}
