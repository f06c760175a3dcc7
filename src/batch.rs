//! Batch download driver.
//!
//! Takes a list of [`SeriesSpec`]s, resolves each dataset/edition once
//! (cached across series), fetches the full time series, and writes one
//! CSV per series plus a `_metadata.csv` index. Failures are isolated per
//! series: one series failing never aborts the others, and the summary
//! reports successes and failures side by side.
//!
//! The driver is deliberately sequential with a politeness delay between
//! requests against the shared public endpoint. Retryable failures (network,
//! timeout, 5xx) are retried with exponential backoff; not-found and
//! precondition failures are reported immediately.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::api::{Client, dimension_names};
use crate::error::{Error, Result};
use crate::models::{Assignment, DimensionValue, ObservationSet, VersionRef};
use crate::{period, storage};

/// One series to download: a dataset, a human label (slugged into the
/// output filename), an optional pinned edition, and the option code per
/// dimension. A value of `"*"` selects the wildcard; the time dimension
/// defaults to the wildcard when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub dataset: String,
    pub label: String,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
}

/// A successfully saved series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesReport {
    pub dataset: String,
    pub label: String,
    pub filename: String,
    pub version_href: String,
    pub observations: usize,
    pub parse_failures: usize,
    pub period_start: String,
    pub period_end: String,
}

/// A series that could not be downloaded or saved.
#[derive(Debug)]
pub struct SeriesFailure {
    pub dataset: String,
    pub label: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub saved: Vec<SeriesReport>,
    pub failed: Vec<SeriesFailure>,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Pause between series (politeness towards the shared endpoint).
    pub delay: Duration,
    /// Total attempts per series for retryable failures.
    pub retries: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            retries: 3,
        }
    }
}

/// Download every series into `out_dir`. Returns `Err` only for local I/O
/// problems (creating the directory, writing the index); per-series
/// failures land in the summary.
pub fn download_all(
    client: &Client,
    series: &[SeriesSpec],
    out_dir: &Path,
    opts: &BatchOptions,
) -> Result<BatchSummary> {
    fs::create_dir_all(out_dir).map_err(|e| Error::Io {
        path: out_dir.display().to_string(),
        source: e,
    })?;

    let mut versions: HashMap<(String, String), VersionRef> = HashMap::new();
    let mut summary = BatchSummary::default();

    for (i, spec) in series.iter().enumerate() {
        log::info!("[{}/{}] {}", i + 1, series.len(), spec.label);
        match fetch_with_retry(client, spec, &mut versions, opts) {
            Ok((vref, set)) => {
                let filename = format!("{}.csv", slug(&spec.label));
                match storage::save_csv(&set.rows, out_dir.join(&filename)) {
                    Ok(()) => {
                        log::info!("{}: saved {} observations", spec.label, set.rows.len());
                        summary.saved.push(SeriesReport {
                            dataset: spec.dataset.clone(),
                            label: spec.label.clone(),
                            filename,
                            version_href: vref.href,
                            observations: set.rows.len(),
                            parse_failures: set.failures.len(),
                            period_start: set.rows.first().map(|r| r.period_id.clone()).unwrap_or_default(),
                            period_end: set.rows.last().map(|r| r.period_id.clone()).unwrap_or_default(),
                        });
                    }
                    Err(e) => summary.failed.push(failure(spec, e)),
                }
            }
            Err(e) => {
                log::warn!("{}: {}", spec.label, e);
                summary.failed.push(failure(spec, e));
            }
        }
        if i + 1 < series.len() {
            thread::sleep(opts.delay);
        }
    }

    if !summary.saved.is_empty() {
        write_metadata(out_dir, &summary.saved)?;
    }
    Ok(summary)
}

fn failure(spec: &SeriesSpec, error: Error) -> SeriesFailure {
    SeriesFailure {
        dataset: spec.dataset.clone(),
        label: spec.label.clone(),
        error,
    }
}

fn fetch_with_retry(
    client: &Client,
    spec: &SeriesSpec,
    versions: &mut HashMap<(String, String), VersionRef>,
    opts: &BatchOptions,
) -> Result<(VersionRef, ObservationSet)> {
    let mut attempt = 0;
    loop {
        match fetch_one(client, spec, versions) {
            Ok(out) => return Ok(out),
            Err(e) if e.is_retryable() && attempt + 1 < opts.retries => {
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
                log::warn!("{}: retrying in {:?} after: {}", spec.label, backoff, e);
                thread::sleep(backoff);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn fetch_one(
    client: &Client,
    spec: &SeriesSpec,
    versions: &mut HashMap<(String, String), VersionRef>,
) -> Result<(VersionRef, ObservationSet)> {
    let key = (
        spec.dataset.clone(),
        spec.edition.clone().unwrap_or_default(),
    );
    let vref = match versions.get(&key) {
        Some(v) => v.clone(),
        None => {
            let v = match &spec.edition {
                Some(edition) => client.resolve_edition(&spec.dataset, edition)?,
                None => client.resolve_latest_version(&spec.dataset)?,
            };
            versions.insert(key, v.clone());
            v
        }
    };

    let dims = client.list_dimensions(&vref)?;
    let required = dimension_names(&dims);
    let assignment = build_assignment(&required, &spec.dimensions);
    let mut set = client.fetch_observations(&vref, &required, &assignment)?;
    period::sort_chronological(&mut set.rows);
    Ok((vref, set))
}

/// Turn a series spec's plain string values into a tagged assignment. `"*"`
/// maps to the wildcard; an unassigned time dimension gets the wildcard
/// (full series) by default. Missing non-time dimensions are left out so
/// validation can itemize them.
fn build_assignment(required: &BTreeSet<String>, overrides: &BTreeMap<String, String>) -> Assignment {
    let mut assignment = Assignment::new();
    for (name, value) in overrides {
        let v = if value == "*" {
            DimensionValue::Wildcard
        } else {
            DimensionValue::code(value)
        };
        assignment.insert(name.clone(), v);
    }
    for name in required {
        if name.eq_ignore_ascii_case("time") && !assignment.contains_key(name) {
            assignment.insert(name.clone(), DimensionValue::Wildcard);
        }
    }
    assignment
}

fn write_metadata(out_dir: &Path, saved: &[SeriesReport]) -> Result<()> {
    let path = out_dir.join("_metadata.csv");
    let mut wtr = csv::WriterBuilder::new()
        .from_path(&path)
        .map_err(|e| Error::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
    for report in saved {
        wtr.serialize(report).map_err(|e| Error::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
    }
    wtr.flush().map_err(|e| Error::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// Convert a human label like `"GDP growth (QoQ)"` to `"gdp_growth_qoq"`.
pub fn slug(label: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap());
    let lowered = label.to_lowercase().replace('%', "pct").replace('&', "and");
    re.replace_all(&lowered, "_").trim_matches('_').to_string()
}
