use crate::error::{GeoStatError, Result};
use crate::models::DataPoint;
use crate::store::AggregateFrame;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One country row of a canonical indicator file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub name: String,
    pub code: String,
    pub values: BTreeMap<i32, f64>,
    /// Non-empty cells that did not parse as a finite number, or sit under a
    /// header that is not a year.
    pub skipped_cells: usize,
}

/// Canonical indicator CSV: `Country Name, Country Code, year₁ … yearₙ`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedIndicatorFile {
    /// Header columns after the two identity columns; `None` where the header
    /// is not a year.
    pub years: Vec<Option<i32>>,
    pub rows: Vec<ParsedRow>,
    /// Records that could not be read or carry no country code.
    pub malformed_rows: usize,
}

/// Read a canonical indicator CSV.
///
/// Only a missing file or an unreadable header is an error; bad records and
/// cells are counted and skipped.
pub fn read_indicator_csv<P: AsRef<Path>>(path: P) -> Result<ParsedIndicatorFile> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(GeoStatError::MissingFile(path.to_path_buf()));
    }
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let headers = rdr.headers()?.clone();
    if headers.len() < 2 {
        return Err(GeoStatError::MalformedFile {
            path: path.to_path_buf(),
            message: "expected at least 'Country Name' and 'Country Code' columns".into(),
        });
    }
    let years: Vec<Option<i32>> = headers.iter().skip(2).map(|h| h.parse().ok()).collect();

    let mut out = ParsedIndicatorFile {
        years,
        ..Default::default()
    };
    for (line, rec) in rdr.records().enumerate() {
        let parsed = match rec {
            Ok(rec) => parse_row(&rec, &out.years),
            Err(e) => {
                log::debug!("{}: unreadable record {}: {}", path.display(), line + 2, e);
                None
            }
        };
        match parsed {
            Some(row) => out.rows.push(row),
            None => out.malformed_rows += 1,
        }
    }
    Ok(out)
}

fn parse_row(rec: &StringRecord, years: &[Option<i32>]) -> Option<ParsedRow> {
    let code = rec.get(1)?.trim();
    if code.is_empty() {
        return None;
    }
    let mut values = BTreeMap::new();
    let mut skipped_cells = 0;
    for (i, cell) in rec.iter().enumerate().skip(2) {
        if cell.is_empty() {
            continue;
        }
        let year = years.get(i - 2).copied().flatten();
        match (year, cell.parse::<f64>()) {
            (Some(y), Ok(v)) if v.is_finite() => {
                values.insert(y, v);
            }
            _ => skipped_cells += 1,
        }
    }
    Some(ParsedRow {
        name: rec.get(0).unwrap_or_default().to_string(),
        code: code.to_string(),
        values,
        skipped_cells,
    })
}

/// Prefix cells that spreadsheet tools would evaluate as formulas.
fn safe_cell(s: &str) -> Cow<'_, str> {
    if s.starts_with(['=', '+', '-', '@']) {
        Cow::Owned(format!("'{s}"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Save an aggregate as CSV, one row per (year, admitted country):
/// `year,name,region,population,<indicators…>`.
pub fn save_aggregate_csv<P: AsRef<Path>>(frame: &AggregateFrame, path: P) -> Result<()> {
    let indicators: Vec<&String> = frame
        .years
        .values()
        .next()
        .map(|yf| yf.indicators.keys().collect())
        .unwrap_or_default();

    for (year, yf) in &frame.years {
        if yf.region.len() != yf.len() || yf.population.len() != yf.len() {
            return Err(GeoStatError::InvalidRecord(format!(
                "year {year}: name, region and population columns differ in length"
            )));
        }
    }

    let mut wtr = WriterBuilder::new().from_path(path)?;
    let mut header = vec!["year", "name", "region", "population"];
    header.extend(indicators.iter().map(|s| s.as_str()));
    let header: Vec<Cow<'_, str>> = header.into_iter().map(safe_cell).collect();
    wtr.write_record(header.iter().map(|c| &**c))?;

    for (year, yf) in &frame.years {
        let columns = yf.name.iter().zip(&yf.region).zip(&yf.population);
        for (i, ((name, region), pop)) in columns.enumerate() {
            let mut row = vec![
                year.to_string(),
                safe_cell(name).into_owned(),
                safe_cell(region).into_owned(),
                pop.to_string(),
            ];
            for ind in &indicators {
                let v = yf.indicators.get(*ind).and_then(|col| col.get(i));
                row.push(v.map(f64::to_string).unwrap_or_default());
            }
            wtr.write_record(&row)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Save an aggregate as pretty JSON keyed by year.
pub fn save_aggregate_json<P: AsRef<Path>>(frame: &AggregateFrame, path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(frame)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Save paired points as a two-column CSV with the given axis labels.
pub fn save_pairs_csv<P: AsRef<Path>>(
    points: &[DataPoint],
    x_label: &str,
    y_label: &str,
    path: P,
) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record([&*safe_cell(x_label), &*safe_cell(y_label)])?;
    for p in points {
        wtr.write_record([p.x.to_string(), p.y.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}
