use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use ons_rs::api::dimension_names;
use ons_rs::{Assignment, Client, DimensionValue, batch, period, storage};

#[derive(Parser, Debug)]
#[command(
    name = "ons",
    version,
    about = "Discover, query & download ONS datasets"
)]
struct Cli {
    /// Override the API base URL (e.g. for a mirror or test server).
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every dataset in the catalogue.
    Datasets(DatasetsArgs),
    /// Show the dimensions of a dataset and their valid option codes.
    Dimensions(DimensionsArgs),
    /// Fetch one series (and optionally save it).
    Get(GetArgs),
    /// Download a collection of series defined in a JSON file.
    Batch(BatchArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct DatasetsArgs {
    /// Save a catalogue summary CSV to this path.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DimensionsArgs {
    /// Dataset id (e.g. trade, labour-market, cpih01)
    dataset: String,
    /// Use a specific edition instead of the latest version pointer.
    #[arg(long)]
    edition: Option<String>,
    /// How many option codes to print per dimension.
    #[arg(long, default_value_t = 10)]
    show: usize,
}

#[derive(Args, Debug)]
struct GetArgs {
    /// Dataset id (e.g. trade)
    dataset: String,
    /// Use a specific edition instead of the latest version pointer.
    #[arg(long)]
    edition: Option<String>,
    /// Dimension assignment as NAME=VALUE, repeated per dimension.
    /// VALUE `*` is the wildcard; time defaults to `*` if the dataset
    /// requires it and no value is given.
    #[arg(short = 'd', long = "dim", value_name = "NAME=VALUE")]
    dims: Vec<String>,
    /// Save results to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// JSON file holding an array of series specs
    /// ({dataset, label, edition?, dimensions}).
    series: PathBuf,
    /// Directory for the per-series CSV files and the _metadata.csv index.
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,
    /// Pause between series, in milliseconds.
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,
    /// Attempts per series for retryable failures.
    #[arg(long, default_value_t = 3)]
    retries: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let client = match &cli.base_url {
        Some(url) => Client::with_base_url(url),
        None => Client::default(),
    };
    match cli.cmd {
        Command::Datasets(args) => cmd_datasets(&client, args),
        Command::Dimensions(args) => cmd_dimensions(&client, args),
        Command::Get(args) => cmd_get(&client, args),
        Command::Batch(args) => cmd_batch(&client, args),
    }
}

fn cmd_datasets(client: &Client, args: DatasetsArgs) -> Result<()> {
    eprintln!("Fetching dataset catalogue...");
    let mut datasets = Vec::new();
    for ds in client.list_datasets() {
        datasets.push(ds?);
    }

    println!("{:<45} Title", "ID");
    println!("{}", "-".repeat(100));
    for ds in &datasets {
        println!("{:<45} {}", ds.id, ds.title);
    }
    eprintln!("\nFound {} datasets.", datasets.len());

    if let Some(path) = args.out.as_ref() {
        storage::save_catalogue_csv(&datasets, path)?;
        eprintln!("Saved catalogue to {}", path.display());
    }
    Ok(())
}

fn cmd_dimensions(client: &Client, args: DimensionsArgs) -> Result<()> {
    let version = resolve(client, &args.dataset, args.edition.as_deref())?;
    eprintln!("Version URL: {}\n", version.href);

    let dims = client.list_dimensions(&version)?;
    let mut template: Vec<String> = Vec::new();

    for dim in &dims {
        let options = client.list_options(&version, dim.options_id())?;
        println!(
            "Dimension: {} ({})",
            dim.name,
            dim.label.as_deref().unwrap_or(&dim.name)
        );
        println!("  {} valid option(s):", options.len());
        for opt in options.iter().take(args.show) {
            println!("    {}: {}", opt.option, opt.label);
        }
        if options.len() > args.show {
            println!("    ... and {} more", options.len() - args.show);
        }
        println!();

        if dim.name.eq_ignore_ascii_case("time") {
            template.push(format!("-d '{}=*'", dim.name));
        } else if let Some(first) = options.first() {
            template.push(format!("-d '{}={}'", dim.name, first.option));
        }
    }

    println!("Template query (first option per dimension, full time series):");
    println!("  ons get {} {}", args.dataset, template.join(" "));
    Ok(())
}

fn cmd_get(client: &Client, args: GetArgs) -> Result<()> {
    let version = resolve(client, &args.dataset, args.edition.as_deref())?;
    eprintln!("Version URL: {}", version.href);

    let dims = client.list_dimensions(&version)?;
    let required = dimension_names(&dims);

    let mut assignment = parse_assignment(&args.dims)?;
    for name in &required {
        if name.eq_ignore_ascii_case("time") && !assignment.contains_key(name) {
            assignment.insert(name.clone(), DimensionValue::Wildcard);
        }
    }

    let mut obs = client.fetch_observations(&version, &required, &assignment)?;
    period::sort_chronological(&mut obs.rows);

    if !obs.failures.is_empty() {
        eprintln!(
            "Warning: {} observation(s) had unparseable values and were skipped",
            obs.failures.len()
        );
    }
    eprintln!("Got {} observations.\n", obs.rows.len());

    let n = obs.rows.len();
    for r in obs.rows.iter().take(5) {
        println!("{:<10} {:<16} {}", r.period_id, r.period_label, r.value);
    }
    if n > 10 {
        println!("...");
    }
    if n > 5 {
        for r in obs.rows.iter().skip(n.max(10) - 5) {
            println!("{:<10} {:<16} {}", r.period_id, r.period_label, r.value);
        }
    }

    if let Some(path) = args.out.as_ref() {
        let fmt = match args.format {
            Some(OutFormat::Csv) => "csv",
            Some(OutFormat::Json) => "json",
            None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
        }
        .to_ascii_lowercase();
        match fmt.as_str() {
            "csv" => storage::save_csv(&obs.rows, path)?,
            "json" => storage::save_json(&obs.rows, path)?,
            other => anyhow::bail!("unsupported format: {}", other),
        }
        eprintln!("\nSaved {} rows to {}", obs.rows.len(), path.display());
    }
    Ok(())
}

fn cmd_batch(client: &Client, args: BatchArgs) -> Result<()> {
    let body = std::fs::read_to_string(&args.series)?;
    let series: Vec<batch::SeriesSpec> = serde_json::from_str(&body)?;
    eprintln!("Downloading {} series...", series.len());

    let opts = batch::BatchOptions {
        delay: std::time::Duration::from_millis(args.delay_ms),
        retries: args.retries,
    };
    let summary = batch::download_all(client, &series, &args.out_dir, &opts)?;

    eprintln!(
        "\nDone. {} series saved to {}",
        summary.saved.len(),
        args.out_dir.display()
    );
    if !summary.failed.is_empty() {
        eprintln!("{} series failed:", summary.failed.len());
        for f in &summary.failed {
            eprintln!("  {}: {} - {}", f.dataset, f.label, f.error);
        }
        if summary.saved.is_empty() {
            anyhow::bail!("all series failed");
        }
    }
    Ok(())
}

fn resolve(client: &Client, dataset: &str, edition: Option<&str>) -> Result<ons_rs::VersionRef> {
    eprintln!("Looking up dataset '{}'...", dataset);
    let vref = match edition {
        Some(e) => client.resolve_edition(dataset, e)?,
        None => client.resolve_latest_version(dataset)?,
    };
    Ok(vref)
}

fn parse_assignment(pairs: &[String]) -> Result<Assignment> {
    let mut assignment = Assignment::new();
    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            anyhow::bail!("invalid --dim '{}', expected NAME=VALUE", pair);
        };
        let value = match value.trim() {
            "*" => DimensionValue::Wildcard,
            code => DimensionValue::code(code),
        };
        assignment.insert(name.trim().to_string(), value);
    }
    Ok(assignment)
}
