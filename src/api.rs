//! Synchronous client for the **ONS beta API (v1)**.
//!
//! Covers the dataset catalogue, edition/version resolution, dimension
//! discovery, and the observations endpoint. List endpoints are walked
//! through [`Client::paginate`], a lazy offset/limit pager.
//!
//! ### Notes
//! - Observations can only be requested from a resolved *version* URL;
//!   [`Client::resolve_latest_version`] finds one from a dataset id.
//! - Every dimension of the target version must be assigned a value
//!   (or the wildcard, on at most one dimension); the assignment is
//!   validated client-side before any request is made.
//! - Network timeouts default to 30s total / 10s connect and can be
//!   changed through [`Client::builder`]. The client never retries:
//!   transport errors are reported with [`Error::is_retryable`] so the
//!   caller can decide.
//!
//! Typical usage:
//! ```no_run
//! # use ons_rs::{Client, DimensionValue};
//! let client = Client::default();
//! let version = client.resolve_latest_version("trade")?;
//! let dims = client.list_dimensions(&version)?;
//! let mut assignment = ons_rs::Assignment::new();
//! assignment.insert("time".into(), DimensionValue::Wildcard);
//! assignment.insert("geography".into(), DimensionValue::code("K02000001"));
//! // ...one entry per dimension in `dims`...
//! let obs = client.fetch_observations(&version, &ons_rs::api::dimension_names(&dims), &assignment)?;
//! # Ok::<(), ons_rs::Error>(())
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::models::{
    Assignment, Dataset, Dimension, DimensionOption, Edition, ObservationSet,
    ObservationsResponse, Page, Version, VersionRef,
};

/// Public base path of the ONS beta API.
pub const DEFAULT_BASE_URL: &str = "https://api.beta.ons.gov.uk/v1";

/// Page size for catalogue/edition/version listings. The API caps list
/// pages at 50 items.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Page size for dimension option listings; option counts routinely exceed
/// one catalogue page.
pub const OPTIONS_PAGE_SIZE: usize = 200;

// Allow -, _, . unescaped in ids interpolated into URL paths.
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn enc(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string()
}

#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    http: HttpClient,
}

/// Configures base URL and timeouts. All knobs have working defaults;
/// `Client::default()` is `Client::builder().build()`.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    timeout: Duration,
    connect_timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Total per-request timeout. A request that exceeds it fails with a
    /// [`Error::Transport`] whose `timeout` flag is set; nothing hangs.
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }

    pub fn build(self) -> Client {
        let http = HttpClient::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(Policy::limited(5))
            .user_agent(concat!("ons_rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client build");
        Client {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            http,
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Client::builder().build()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Shorthand for a default client pointed at a different base URL.
    pub fn with_base_url(url: impl Into<String>) -> Self {
        Client::builder().base_url(url).build()
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(String, String)]) -> Result<T> {
        log::debug!("GET {url}");
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .map_err(|e| Error::Transport {
                url: url.to_string(),
                status: None,
                timeout: e.is_timeout(),
                source: Some(e),
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Transport {
                url: url.to_string(),
                status: Some(status.as_u16()),
                timeout: false,
                source: None,
            });
        }
        resp.json::<T>().map_err(|e| Error::Transport {
            url: url.to_string(),
            status: None,
            timeout: e.is_timeout(),
            source: Some(e),
        })
    }

    /// Lazily walk an offset/limit list endpoint.
    ///
    /// The sequence is finite and non-restartable: pages are requested with
    /// `offset += <items received>` until a page comes back short (or
    /// `total_count` says the listing is exhausted). An empty first page is
    /// a valid empty listing, not an error. The pager does not retry; a
    /// transport failure ends the sequence with one `Err` item.
    pub fn paginate<T: DeserializeOwned>(&self, url: &str, page_size: usize) -> Pages<'_, T> {
        Pages {
            client: self,
            url: url.to_string(),
            page_size: page_size.max(1),
            offset: 0,
            total_count: None,
            buf: VecDeque::new(),
            done: false,
        }
    }

    /// Stream the full dataset catalogue.
    pub fn list_datasets(&self) -> Pages<'_, Dataset> {
        let url = format!("{}/datasets", self.base_url);
        self.paginate(&url, DEFAULT_PAGE_SIZE)
    }

    /// Fetch metadata for one dataset.
    pub fn get_dataset(&self, dataset_id: &str) -> Result<Dataset> {
        let url = format!("{}/datasets/{}", self.base_url, enc(dataset_id));
        self.get_json(&url, &[]).map_err(|e| {
            if e.is_http_status(404) {
                Error::DatasetNotFound(dataset_id.to_string())
            } else {
                e
            }
        })
    }

    /// Resolve the most recent usable version of a dataset.
    ///
    /// Fast path: when the dataset carries a `latest_version` link it is
    /// followed directly, with no edition enumeration. Otherwise every
    /// edition's versions are enumerated and the winner is chosen by the
    /// documented total order: greatest release timestamp, then highest
    /// version id (numeric comparison when both ids are integers), then
    /// lexicographically greatest edition id. The API defines no canonical
    /// ordering for vintage codes, so the tie-break is deliberate policy
    /// rather than reliance on list order.
    pub fn resolve_latest_version(&self, dataset_id: &str) -> Result<VersionRef> {
        let ds = self.get_dataset(dataset_id)?;
        if let Some(link) = nonempty_link(&ds.links.latest_version) {
            log::info!("{dataset_id}: using latest_version link {link}");
            return Ok(VersionRef::from_href(dataset_id, link));
        }

        let editions_url = self.editions_url(&ds);
        let mut candidates: Vec<Candidate> = Vec::new();
        for edition in self.paginate::<Edition>(&editions_url, DEFAULT_PAGE_SIZE) {
            let edition = edition.map_err(|e| {
                if e.is_http_status(404) {
                    Error::NoVersionsAvailable(dataset_id.to_string())
                } else {
                    e
                }
            })?;
            candidates.extend(self.version_candidates(dataset_id, &edition)?);
        }

        let best = candidates
            .into_iter()
            .max_by(compare_candidates)
            .ok_or_else(|| Error::NoVersionsAvailable(dataset_id.to_string()))?;
        log::info!("{dataset_id}: resolved {}", best.href);
        Ok(VersionRef {
            dataset: dataset_id.to_string(),
            edition: Some(best.edition),
            version: Some(best.version).filter(|v| !v.is_empty()),
            href: best.href,
        })
    }

    /// Resolve the latest version of one named edition (e.g. a pinned
    /// vintage like `"PWT24"`). Fails with [`Error::EditionNotFound`] when
    /// the dataset has no such edition.
    pub fn resolve_edition(&self, dataset_id: &str, edition_id: &str) -> Result<VersionRef> {
        let ds = self.get_dataset(dataset_id)?;
        let editions_url = self.editions_url(&ds);
        let not_found = || Error::EditionNotFound {
            dataset: dataset_id.to_string(),
            edition: edition_id.to_string(),
        };

        let mut found = None;
        for edition in self.paginate::<Edition>(&editions_url, DEFAULT_PAGE_SIZE) {
            let edition = edition.map_err(|e| if e.is_http_status(404) { not_found() } else { e })?;
            if edition.id == edition_id {
                found = Some(edition);
                break;
            }
        }
        let edition = found.ok_or_else(not_found)?;

        if let Some(link) = nonempty_link(&edition.links.latest_version) {
            let mut vref = VersionRef::from_href(dataset_id, link);
            vref.edition.get_or_insert_with(|| edition_id.to_string());
            return Ok(vref);
        }
        let best = self
            .version_candidates(dataset_id, &edition)?
            .into_iter()
            .max_by(compare_candidates)
            .ok_or_else(|| Error::NoVersionsAvailable(dataset_id.to_string()))?;
        Ok(VersionRef {
            dataset: dataset_id.to_string(),
            edition: Some(best.edition),
            version: Some(best.version).filter(|v| !v.is_empty()),
            href: best.href,
        })
    }

    /// List the dimensions of a resolved version. A full observations query
    /// must assign a value to every name returned here.
    pub fn list_dimensions(&self, version: &VersionRef) -> Result<Vec<Dimension>> {
        let url = version.dimensions_url();
        let page: Page<Dimension> = self.get_json(&url, &[]).map_err(|e| {
            if e.is_http_status(404) {
                Error::VersionNotFound(version.describe())
            } else {
                e
            }
        })?;
        Ok(page.items)
    }

    /// List the valid option codes for one dimension, in API order. Option
    /// counts can exceed a page, so this walks the pager underneath.
    pub fn list_options(&self, version: &VersionRef, dimension: &str) -> Result<Vec<DimensionOption>> {
        let url = format!("{}/{}/options", version.dimensions_url(), enc(dimension));
        let mut out = Vec::new();
        for item in self.paginate::<DimensionOption>(&url, OPTIONS_PAGE_SIZE) {
            out.push(item.map_err(|e| {
                if e.is_http_status(404) {
                    Error::DimensionNotFound(dimension.to_string())
                } else {
                    e
                }
            })?);
        }
        Ok(out)
    }

    /// Fetch observations for a fully-specified dimension assignment.
    ///
    /// `required` is the dimension name set of the target version (from
    /// [`Client::list_dimensions`]). The assignment is validated locally
    /// first (keys must equal `required` exactly, at most one wildcard), so
    /// an invalid query fails before any network call, itemizing every
    /// missing dimension instead of the upstream service's one-at-a-time
    /// 400 responses.
    ///
    /// Rows come back sorted by `period_id` (lexicographic). Callers that
    /// need chronological order should re-sort with
    /// [`crate::period::chronological`]; period ids are not guaranteed to
    /// sort chronologically as strings.
    pub fn fetch_observations(
        &self,
        version: &VersionRef,
        required: &BTreeSet<String>,
        assignment: &Assignment,
    ) -> Result<ObservationSet> {
        validate_assignment(required, assignment)?;

        let query: Vec<(String, String)> = assignment
            .iter()
            .map(|(name, value)| (name.clone(), value.as_query_value().to_string()))
            .collect();
        let url = version.observations_url();
        let resp: ObservationsResponse = self.get_json(&url, &query).map_err(|e| {
            if e.is_http_status(404) {
                Error::VersionNotFound(version.describe())
            } else {
                e
            }
        })?;

        let mut set = ObservationSet::from_response(resp);
        set.sort_rows_by(|a, b| a.period_id.cmp(&b.period_id));
        log::info!(
            "{}: {} observations, {} unparseable",
            version.describe(),
            set.rows.len(),
            set.failures.len()
        );
        Ok(set)
    }

    /// Convenience wrapper: discover the version's dimensions, then fetch.
    /// One extra round trip; use [`Client::fetch_observations`] directly
    /// when the dimension set is already known.
    pub fn fetch_series(&self, version: &VersionRef, assignment: &Assignment) -> Result<ObservationSet> {
        let dims = self.list_dimensions(version)?;
        self.fetch_observations(version, &dimension_names(&dims), assignment)
    }

    fn editions_url(&self, ds: &Dataset) -> String {
        nonempty_link(&ds.links.editions)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/datasets/{}/editions", self.base_url, enc(&ds.id)))
    }

    /// All published versions of one edition as tie-break candidates. A 404
    /// from the versions endpoint means the edition is empty, not an error.
    fn version_candidates(&self, dataset_id: &str, edition: &Edition) -> Result<Vec<Candidate>> {
        let url = nonempty_link(&edition.links.versions)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "{}/datasets/{}/editions/{}/versions",
                    self.base_url,
                    enc(dataset_id),
                    enc(&edition.id)
                )
            });
        let mut out = Vec::new();
        for version in self.paginate::<Version>(&url, DEFAULT_PAGE_SIZE) {
            let version = match version {
                Ok(v) => v,
                Err(e) if e.is_http_status(404) => break,
                Err(e) => return Err(e),
            };
            let id = version.version.clone().unwrap_or_default();
            let href = version
                .links
                .self_link
                .as_ref()
                .map(|l| l.href.clone())
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| format!("{}/{}", url, enc(&id)));
            out.push(Candidate {
                release: version.release_date,
                version: id,
                edition: edition.id.clone(),
                href,
            });
        }
        Ok(out)
    }
}

/// The dimension name set of a version, for assignment validation.
pub fn dimension_names(dims: &[Dimension]) -> BTreeSet<String> {
    dims.iter().map(|d| d.name.clone()).collect()
}

/// Check an assignment against the required dimension set without touching
/// the network: unknown keys, then missing keys (all of them at once), then
/// the at-most-one-wildcard rule.
pub fn validate_assignment(required: &BTreeSet<String>, assignment: &Assignment) -> Result<()> {
    if let Some(unknown) = assignment.keys().find(|k| !required.contains(*k)) {
        return Err(Error::DimensionNotFound(unknown.clone()));
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|name| !assignment.contains_key(*name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(Error::IncompleteAssignment { missing });
    }

    let wildcards: Vec<String> = assignment
        .iter()
        .filter(|(_, v)| v.is_wildcard())
        .map(|(k, _)| k.clone())
        .collect();
    if wildcards.len() > 1 {
        return Err(Error::TooManyWildcards {
            dimensions: wildcards,
        });
    }
    Ok(())
}

fn nonempty_link(link: &Option<crate::models::Link>) -> Option<&str> {
    link.as_ref().map(|l| l.href.as_str()).filter(|h| !h.is_empty())
}

struct Candidate {
    release: Option<DateTime<Utc>>,
    version: String,
    edition: String,
    href: String,
}

/// Total order for version selection: release timestamp (missing sorts
/// first), then version id, then edition id.
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.release
        .cmp(&b.release)
        .then_with(|| cmp_version_ids(&a.version, &b.version))
        .then_with(|| a.edition.cmp(&b.edition))
}

/// Version ids compare numerically when both sides are integers (so "10"
/// beats "2"), lexicographically otherwise.
fn cmp_version_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Lazy page walker returned by [`Client::paginate`].
pub struct Pages<'a, T> {
    client: &'a Client,
    url: String,
    page_size: usize,
    offset: usize,
    total_count: Option<u64>,
    buf: VecDeque<T>,
    done: bool,
}

impl<'a, T: DeserializeOwned> Iterator for Pages<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buf.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Some(total) = self.total_count {
                if self.offset as u64 >= total {
                    self.done = true;
                    return None;
                }
            }

            let query = vec![
                ("offset".to_string(), self.offset.to_string()),
                ("limit".to_string(), self.page_size.to_string()),
            ];
            let page: Page<T> = match self.client.get_json(&self.url, &query) {
                Ok(p) => p,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            self.total_count = page.total_count.or(self.total_count);

            let received = page.items.len();
            if received == 0 {
                self.done = true;
                continue;
            }
            self.offset += received;
            if received < self.page_size {
                self.done = true;
            }
            self.buf.extend(page.items);
        }
    }
}
