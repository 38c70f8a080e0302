//! End-to-end tests of loading canonical CSVs and querying the store.

use geostat::{DataStore, GeoRegistry, GeoStatError, POPULATION, RegionType};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const GEO: &str = r#"[
  {"name": "Japan", "alpha-3": "JPN", "region": "Asia", "sub-region": "Eastern Asia", "intermediate-region": ""},
  {"name": "China", "alpha-3": "CHN", "region": "Asia", "sub-region": "Eastern Asia", "intermediate-region": ""},
  {"name": "India", "alpha-3": "IND", "region": "Asia", "sub-region": "Southern Asia", "intermediate-region": ""},
  {"name": "Tuvalu", "alpha-3": "TUV", "region": "Oceania", "sub-region": "Polynesia", "intermediate-region": ""},
  {"name": "Brazil", "alpha-3": "BRA", "region": "Americas", "sub-region": "Latin America and the Caribbean", "intermediate-region": "South America"},
  {"name": "Germany", "alpha-3": "DEU", "region": "Europe", "sub-region": "Western Europe", "intermediate-region": ""}
]"#;

const POP: &str = "Country Name,Country Code,2000,2001,2002
Japan,JPN,126800000,127100000,127400000
China,CHN,1262600000,1271800000,1397715000
India,IND,1056600000,1071500000,1086000000
Tuvalu,TUV,8913,9000,9100
Brazil,BRA,174800000,,178000000
Germany,DEU,82200000,82300000,82500000
World,WLD,6100000000,6200000000,6300000000
";

const GDP: &str = "Country Name,Country Code,2000,2001,2002
Japan,JPN,39169,34406,32289
China,CHN,959,1053,1148
India,IND,442,451,470
Tuvalu,TUV,1500,1600,
Brazil,BRA,3750,3157,2829
Germany,DEU,23635,23607,..
";

struct Fixture {
    _dir: TempDir,
    geo: PathBuf,
    pop: PathBuf,
    gdp: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let write = |name: &str, body: &str| {
        let p = dir.path().join(name);
        fs::write(&p, body).unwrap();
        p
    };
    let geo = write("country_by_region.json", GEO);
    let pop = write("population.csv", POP);
    let gdp = write("gdp.csv", GDP);
    Fixture { _dir: dir, geo, pop, gdp }
}

fn loaded(f: &Fixture) -> DataStore {
    let registry = GeoRegistry::from_json_file(&f.geo).unwrap();
    let mut store = DataStore::new(registry, &f.pop, POPULATION).unwrap();
    store.load(&f.gdp, "gdp per capita").unwrap();
    store
}

fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}

#[test]
fn bootstrap_populates_known_countries_only() {
    let f = fixture();
    let store = loaded(&f);
    assert_eq!(store.len(), 6);
    assert!(store.country("WLD").is_none());
    let names: Vec<String> = store.country_names().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["Brazil", "China", "Germany", "India", "Japan", "Tuvalu"]);
}

#[test]
fn unknown_indicator_yields_no_values() {
    let f = fixture();
    let store = loaded(&f);
    let jpn = store.country("JPN").unwrap();
    for years in [vec![2000], vec![2000, 2001], vec![]] {
        assert!(jpn.values_for_years(&years, "hdi").is_empty());
    }
    // one missing year empties the whole result
    let bra = store.country("BRA").unwrap();
    assert!(bra.values_for_years(&[2000, 2001], POPULATION).is_empty());
    assert_eq!(bra.values_for_years(&[2002, 2000], POPULATION), vec![178_000_000.0, 174_800_000.0]);
}

#[test]
fn aggregate_admits_only_complete_countries() {
    let f = fixture();
    let store = loaded(&f);
    let frame = store
        .aggregate(&[2000, 2001], &["gdp per capita"], RegionType::Region, None)
        .unwrap();

    // Brazil lacks 2001 population; Germany and Tuvalu are complete for 2000-2001
    for year in [2000, 2001] {
        let yf = frame.get(year).unwrap();
        assert_eq!(
            sorted(yf.name.clone()),
            vec!["China", "Germany", "India", "Japan", "Tuvalu"]
        );
        assert_eq!(yf.region.len(), yf.len());
        assert_eq!(yf.population.len(), yf.len());
        assert_eq!(yf.values("gdp per capita").unwrap().len(), yf.len());
    }

    // Tuvalu and Germany drop out once 2002 is requested
    let frame = store
        .aggregate(&[2000, 2002], &["gdp per capita"], RegionType::Region, None)
        .unwrap();
    assert_eq!(
        sorted(frame.get(2002).unwrap().name.clone()),
        vec!["Brazil", "China", "India", "Japan"]
    );
}

#[test]
fn aggregate_values_stay_aligned_with_labels() {
    let f = fixture();
    let store = loaded(&f);
    let frame = store
        .aggregate(&[2002], &["gdp per capita"], RegionType::SubRegion, None)
        .unwrap();
    let yf = frame.get(2002).unwrap();
    let gdp = yf.values("gdp per capita").unwrap();
    let pairs: Vec<(String, String, f64)> = (0..yf.len())
        .map(|i| (yf.name[i].clone(), yf.region[i].clone(), gdp[i]))
        .collect();
    assert!(pairs.contains(&("India".into(), "Southern Asia".into(), 470.0)));
    assert!(pairs.contains(&("Brazil".into(), "Latin America and the Caribbean".into(), 2829.0)));
}

#[test]
fn population_is_rescaled() {
    let f = fixture();
    let store = loaded(&f);
    let frame = store
        .aggregate(&[2000, 2002], &[], RegionType::Region, Some(&["Asia", "Oceania"][..]))
        .unwrap();
    let at = |year: i32, name: &str| {
        let yf = frame.get(year).unwrap();
        let i = yf.name.iter().position(|n| n == name).unwrap();
        yf.population[i]
    };
    assert!((at(2000, "Tuvalu") - 10.0).abs() < 1e-9);
    assert!((at(2002, "China") - 130.0).abs() < 1e-9);
    assert!(at(2000, "India") < at(2000, "China"));
}

#[test]
fn aggregate_with_no_admitted_country_is_distinct_error() {
    let f = fixture();
    let store = loaded(&f);
    let err = store
        .aggregate(&[2002], &["gdp per capita"], RegionType::Region, Some(&["Europe"][..]))
        .unwrap_err();
    assert!(matches!(err, GeoStatError::NoDataAvailable { year: 2002 }));

    let err = store
        .aggregate(&[1990], &[], RegionType::Region, None)
        .unwrap_err();
    assert!(matches!(err, GeoStatError::NoDataAvailable { year: 1990 }));
}

#[test]
fn query_pairs_unions_best_effort_points() {
    let f = fixture();
    let store = loaded(&f);
    let years = [2000, 2001, 2002];
    let all = store
        .query_pairs(&years, "gdp per capita", POPULATION, None)
        .unwrap();

    let mut expected = 0;
    for (_, code) in store.country_names() {
        let c = store.country(&code).unwrap();
        let pts = c.paired_values(&years, "gdp per capita", POPULATION).unwrap();
        let a = c.series("gdp per capita").unwrap().len();
        let b = c.series(POPULATION).unwrap().len();
        assert!(pts.len() <= a.min(b));
        expected += pts.len();
    }
    // BRA 2, TUV 2, DEU 2, others 3
    assert_eq!(all.len(), expected);
    assert_eq!(all.len(), 15);

    let east = store
        .query_pairs(&years, "gdp per capita", POPULATION, Some("Eastern Asia"))
        .unwrap();
    assert_eq!(east.len(), 6);
    assert!(store
        .query_pairs(&years, "gdp per capita", POPULATION, Some("Antarctica"))
        .unwrap()
        .is_empty());
    assert!(matches!(
        store.query_pairs(&years, POPULATION, POPULATION, None),
        Err(GeoStatError::SameIndicator(_))
    ));
}

#[test]
fn reloading_is_idempotent() {
    let f = fixture();
    let mut store = loaded(&f);
    let before = store.country("JPN").unwrap().clone();
    let report = store.load(&f.gdp, "gdp per capita").unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(store.country("JPN").unwrap(), &before);
    assert_eq!(store.country("JPN").unwrap().series("gdp per capita").unwrap().len(), 3);
}

#[test]
fn accessors_are_sorted() {
    let f = fixture();
    let store = loaded(&f);
    assert_eq!(
        store.region_names(),
        vec!["Americas", "Asia", "Europe", "Oceania"]
    );
    let subs = store.subregion_names();
    assert_eq!(subs, sorted(subs.clone()));
    assert_eq!(store.intermediate_region_names(), vec!["South America"]);
    assert_eq!(
        store.indicator_ids().into_iter().collect::<Vec<_>>(),
        vec!["gdp per capita".to_string(), POPULATION.to_string()]
    );
}

#[test]
fn missing_file_fails_the_load() {
    let f = fixture();
    let mut store = loaded(&f);
    let err = store.load(f.geo.with_file_name("absent.csv"), "hdi").unwrap_err();
    assert!(matches!(err, GeoStatError::MissingFile(_)));
    assert!(!store.indicator_ids().contains("hdi"));
}
