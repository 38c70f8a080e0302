use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use geostat::regression::{self, FitKind};
use geostat::{DataStore, GeoRegistry, POPULATION, RegionType, RescaleConfig};
use geostat::{stats, storage};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "geostat",
    version,
    about = "Aggregate country indicators by region & fit regression curves"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List regions and sub-regions of the geographic reference file.
    Regions(RegionsArgs),
    /// Strict-join aggregate of indicators per year, grouped by region.
    Aggregate(AggregateArgs),
    /// Fit a curve to paired values of two indicators.
    Fit(FitArgs),
}

#[derive(Args, Debug)]
struct RegionsArgs {
    /// Geographic reference JSON (ISO-3166 list with region columns)
    #[arg(long)]
    geo: PathBuf,
    /// Also list intermediate regions.
    #[arg(long, default_value_t = false)]
    all: bool,
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Geographic reference JSON (ISO-3166 list with region columns)
    #[arg(long)]
    geo: PathBuf,
    /// Canonical population CSV (always loaded first)
    #[arg(long)]
    population: PathBuf,
    /// Additional indicator files as INDICATOR=PATH (repeatable)
    #[arg(short = 'D', long = "data", value_name = "INDICATOR=PATH")]
    data: Vec<String>,
    /// Year (YYYY) or range (YYYY:YYYY)
    #[arg(short, long)]
    years: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RegionTypeArg {
    Region,
    SubRegion,
    IntermediateRegion,
}

impl From<RegionTypeArg> for RegionType {
    fn from(r: RegionTypeArg) -> Self {
        match r {
            RegionTypeArg::Region => RegionType::Region,
            RegionTypeArg::SubRegion => RegionType::SubRegion,
            RegionTypeArg::IntermediateRegion => RegionType::IntermediateRegion,
        }
    }
}

#[derive(Args, Debug)]
struct AggregateArgs {
    #[command(flatten)]
    input: DataArgs,
    /// Indicators to include besides population, separated by comma or semicolon
    #[arg(short, long, default_value = "")]
    indicators: String,
    /// Region scheme to group by.
    #[arg(long, value_enum, default_value_t = RegionTypeArg::Region)]
    region_type: RegionTypeArg,
    /// Restrict to these regions (comma or semicolon separated). Default: all.
    #[arg(long)]
    regions: Option<String>,
    /// JSON file overriding the population rescale constants.
    #[arg(long)]
    rescale_config: Option<PathBuf>,
    /// Save the aggregate (.json or .csv).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Print per-region statistics of each indicator for the first year.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModelArg {
    Linear,
    ExpLog,
    ExpLsq,
}

impl From<ModelArg> for FitKind {
    fn from(m: ModelArg) -> Self {
        match m {
            ModelArg::Linear => FitKind::Linear,
            ModelArg::ExpLog => FitKind::ExpLog,
            ModelArg::ExpLsq => FitKind::ExpLsq,
        }
    }
}

#[derive(Args, Debug)]
struct FitArgs {
    #[command(flatten)]
    input: DataArgs,
    /// Independent indicator
    #[arg(short = 'x', long)]
    x: String,
    /// Dependent indicator
    #[arg(short = 'Y', long = "y")]
    y: String,
    /// Restrict to one region, sub-region or intermediate region.
    #[arg(long)]
    region: Option<String>,
    /// Curve to fit.
    #[arg(long, value_enum, default_value_t = ModelArg::Linear)]
    model: ModelArg,
    /// Save the paired points as CSV.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Format up to 4 decimals, then trim trailing zeros and trailing dot.
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_years(s: &str) -> Option<Vec<i32>> {
    if let Some((a, b)) = s.split_once(':') {
        let start = a.trim().parse::<i32>().ok()?;
        let end = b.trim().parse::<i32>().ok()?;
        (start <= end).then(|| (start..=end).collect())
    } else {
        s.trim().parse::<i32>().ok().map(|y| vec![y])
    }
}

fn parse_data(s: &str) -> Option<(String, PathBuf)> {
    let (ind, path) = s.split_once('=')?;
    let ind = ind.trim().to_lowercase();
    (!ind.is_empty() && !path.trim().is_empty()).then(|| (ind, PathBuf::from(path.trim())))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Regions(args) => cmd_regions(args),
        Command::Aggregate(args) => cmd_aggregate(args),
        Command::Fit(args) => cmd_fit(args),
    }
}

fn cmd_regions(args: RegionsArgs) -> Result<()> {
    let registry = GeoRegistry::from_json_file(&args.geo)
        .with_context(|| format!("reading {}", args.geo.display()))?;
    let mut types = vec![RegionType::Region, RegionType::SubRegion];
    if args.all {
        types.push(RegionType::IntermediateRegion);
    }
    for t in types {
        println!("[{}]", t);
        for name in registry.region_names(t) {
            let n = registry.codes_in(t, &name).map_or(0, |c| c.len());
            println!("  {name} ({n})");
        }
    }
    Ok(())
}

fn open_store(args: &DataArgs, rescale: RescaleConfig) -> Result<(DataStore, Vec<i32>)> {
    let years = parse_years(&args.years)
        .ok_or_else(|| anyhow::anyhow!("invalid --years, expected YYYY or YYYY:YYYY"))?;
    let registry = GeoRegistry::from_json_file(&args.geo)
        .with_context(|| format!("reading {}", args.geo.display()))?;
    let mut store = DataStore::with_rescale(registry, rescale, &args.population, POPULATION)
        .with_context(|| format!("loading {}", args.population.display()))?;
    for arg in &args.data {
        let (indicator, path) = parse_data(arg)
            .ok_or_else(|| anyhow::anyhow!("invalid --data '{arg}', expected INDICATOR=PATH"))?;
        let report = store
            .load(&path, &indicator)
            .with_context(|| format!("loading {}", path.display()))?;
        eprintln!(
            "Loaded '{}': {} of {} rows ({} unknown codes, {} skipped cells)",
            indicator, report.admitted, report.rows, report.unknown_codes, report.skipped_cells
        );
    }
    Ok((store, years))
}

fn cmd_aggregate(args: AggregateArgs) -> Result<()> {
    let rescale = match &args.rescale_config {
        Some(p) => RescaleConfig::from_json_file(p)
            .with_context(|| format!("reading {}", p.display()))?,
        None => RescaleConfig::default(),
    };
    let (store, years) = open_store(&args.input, rescale)?;
    let indicators = parse_list(&args.indicators.to_lowercase());
    let indicators: Vec<&str> = indicators.iter().map(String::as_str).collect();
    let regions = args.regions.as_deref().map(parse_list);
    let regions: Option<Vec<&str>> = regions
        .as_ref()
        .map(|r| r.iter().map(String::as_str).collect());

    let frame = store.aggregate(&years, &indicators, args.region_type.into(), regions.as_deref())?;

    for (year, yf) in &frame.years {
        println!("{}: {} countries", year, yf.len());
    }

    if let Some(path) = args.out.as_ref() {
        let fmt = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("json")
            .to_ascii_lowercase();
        match fmt.as_str() {
            "csv" => storage::save_aggregate_csv(&frame, path)?,
            "json" => storage::save_aggregate_json(&frame, path)?,
            other => anyhow::bail!("unsupported format: {}", other),
        }
        eprintln!("Saved aggregate to {}", path.display());
    }

    if args.stats {
        if let Some((year, yf)) = frame.years.iter().next() {
            for field in std::iter::once(POPULATION).chain(indicators.iter().copied()) {
                for (region, s) in stats::grouped_summary(yf, field) {
                    println!(
                        "{} • {} • {}  count={}  min={} max={} mean={} median={}",
                        year,
                        region,
                        field,
                        s.count,
                        fmt_opt(s.min),
                        fmt_opt(s.max),
                        fmt_opt(s.mean),
                        fmt_opt(s.median)
                    );
                }
            }
        }
    }

    Ok(())
}

fn cmd_fit(args: FitArgs) -> Result<()> {
    let (store, years) = open_store(&args.input, RescaleConfig::default())?;
    let x = args.x.to_lowercase();
    let y = args.y.to_lowercase();
    let points = store.query_pairs(&years, &x, &y, args.region.as_deref())?;
    if points.is_empty() {
        anyhow::bail!("no paired values for '{}' and '{}'", x, y);
    }

    if let Some(path) = args.out.as_ref() {
        storage::save_pairs_csv(&points, &x, &y, path)?;
        eprintln!("Saved {} points to {}", points.len(), path.display());
    }

    let fit = regression::fit(args.model.into(), &points)?;
    println!("points={}", fit.n);
    match fit.kind {
        FitKind::Linear => println!("y = a + b·x"),
        FitKind::ExpLog => println!("y = a·b^x"),
        FitKind::ExpLsq => println!("y = exp(a)·e^(b·x)"),
    }
    println!("a={} b={}", fit.a, fit.b);
    if let Some(r2) = fit.r_squared {
        println!("r2={}", fmt_opt(Some(r2)));
    }

    let (sx, sy) = stats::summarize_pairs(&points);
    for (label, s) in [(&x, sx), (&y, sy)] {
        println!(
            "{}  count={}  min={} max={} mean={} median={}",
            label,
            s.count,
            fmt_opt(s.min),
            fmt_opt(s.max),
            fmt_opt(s.mean),
            fmt_opt(s.median)
        );
    }
    Ok(())
}
