//! geostat
//!
//! A small Rust library for exploring country-by-year indicator data: load
//! canonical indicator CSVs, group countries by nested geographic region, and
//! fit simple regression curves. Pairs with the `geostat` CLI.
//!
//! ### Features
//! - Region/sub-region/intermediate-region classification from an ISO-3166 JSON list
//! - Strict-join aggregates per year with a rescaled population column
//! - Best-effort paired queries of two indicators for regression
//! - Linear and exponential fits, r², and summary statistics (min, max, mean, median)
//!
//! ### Example
//! ```no_run
//! use geostat::{DataStore, GeoRegistry, RegionType, regression};
//!
//! let registry = GeoRegistry::from_json_file("data/country_by_region.json")?;
//! let mut store = DataStore::new(registry, "data/population.csv", "population")?;
//! store.load("data/gdp_per_capita.csv", "gdp per capita")?;
//!
//! let years: Vec<i32> = (2000..=2010).collect();
//! let frame = store.aggregate(&years, &["gdp per capita"], RegionType::Region, None)?;
//! println!("{} countries in 2000", frame.get(2000).map_or(0, |y| y.len()));
//!
//! let points = store.query_pairs(&years, "gdp per capita", "population", Some("Europe"))?;
//! let (a, b) = regression::linear_fit(&points)?;
//! println!("y = {a} + {b}x");
//! # Ok::<(), geostat::GeoStatError>(())
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod regression;
pub mod stats;
pub mod storage;
pub mod store;

pub use config::RescaleConfig;
pub use error::{GeoStatError, Result};
pub use geo::GeoRegistry;
pub use models::{CountryRecord, DataPoint, POPULATION, RegionType};
pub use store::{AggregateFrame, DataStore, LoadReport, YearFrame};
