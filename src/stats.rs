use crate::models::DataPoint;
use crate::store::YearFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics for a set of values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Compute count, min, max, mean and median; non-finite values are ignored.
pub fn summarize(values: &[f64]) -> Summary {
    let mut vals: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    vals.sort_by(f64::total_cmp);
    let count = vals.len();
    let min = vals.first().cloned();
    let max = vals.last().cloned();
    let mean = if count > 0 {
        Some(vals.iter().copied().sum::<f64>() / count as f64)
    } else {
        None
    };
    let median = if count == 0 {
        None
    } else if count % 2 == 1 {
        Some(vals[count / 2])
    } else {
        Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
    };
    Summary { count, min, max, mean, median }
}

/// Summaries of the x and y axes of paired points.
pub fn summarize_pairs(points: &[DataPoint]) -> (Summary, Summary) {
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    (summarize(&xs), summarize(&ys))
}

/// Summaries of one numeric field of an aggregate year, grouped by region label.
pub fn grouped_summary(year: &YearFrame, field: &str) -> BTreeMap<String, Summary> {
    let Some(values) = year.values(field) else {
        return BTreeMap::new();
    };
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (region, v) in year.region.iter().zip(values) {
        groups.entry(region.clone()).or_default().push(*v);
    }
    groups
        .into_iter()
        .map(|(region, vals)| (region, summarize(&vals)))
        .collect()
}
