use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValueParseError;

/// A hyperlink as the API represents it. Some links (notably
/// `links.options`) carry an `id` alongside the `href`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Publisher {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetLinks {
    #[serde(default)]
    pub latest_version: Option<Link>,
    #[serde(default)]
    pub editions: Option<Link>,
}

/// Dataset metadata as returned by `GET /datasets/{id}` and the catalogue
/// listing. Immutable snapshot; nothing is persisted locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub publisher: Option<Publisher>,
    #[serde(default)]
    pub links: DatasetLinks,
}

/// One page of a list endpoint. `total_count` is optional: the pager also
/// stops on the first short page.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditionLinks {
    #[serde(default)]
    pub latest_version: Option<Link>,
    #[serde(default)]
    pub versions: Option<Link>,
}

/// An edition of a dataset. The API names the identifier `edition`
/// (e.g. `"time-series"` or a vintage code like `"PWT24"`); vintage codes
/// are opaque strings with no ordering guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edition {
    #[serde(alias = "edition")]
    pub id: String,
    #[serde(default)]
    pub links: EditionLinks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionLinks {
    #[serde(rename = "self", default)]
    pub self_link: Option<Link>,
}

/// A published version within an edition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    /// The API serializes this as a number for some datasets and a string
    /// for others; normalize to `String`.
    #[serde(default, deserialize_with = "de_opt_string_from_string_or_number")]
    pub version: Option<String>,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub links: VersionLinks,
}

/// A resolved pointer to one dataset version. Dimensions and observations
/// are reachable from `href`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRef {
    pub dataset: String,
    pub edition: Option<String>,
    pub version: Option<String>,
    pub href: String,
}

impl VersionRef {
    /// Build a ref from a bare `latest_version` href, recovering the
    /// edition/version segments from the URL path when present.
    pub fn from_href(dataset: impl Into<String>, href: impl Into<String>) -> Self {
        let href = href.into();
        let mut edition = None;
        let mut version = None;
        let segments: Vec<&str> = href.trim_end_matches('/').split('/').collect();
        for pair in segments.windows(2) {
            match pair[0] {
                "editions" => edition = Some(pair[1].to_string()),
                "versions" => version = Some(pair[1].to_string()),
                _ => {}
            }
        }
        Self {
            dataset: dataset.into(),
            edition,
            version,
            href,
        }
    }

    pub fn dimensions_url(&self) -> String {
        format!("{}/dimensions", self.href.trim_end_matches('/'))
    }

    pub fn observations_url(&self) -> String {
        format!("{}/observations", self.href.trim_end_matches('/'))
    }

    /// Human-readable identifier for error messages.
    pub fn describe(&self) -> String {
        match (&self.edition, &self.version) {
            (Some(e), Some(v)) => format!("{}/{}/{}", self.dataset, e, v),
            _ => format!("{} ({})", self.dataset, self.href),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimensionLinks {
    #[serde(default)]
    pub options: Option<Link>,
}

/// A dimension of one dataset version. Every dimension must be assigned a
/// value before observations can be requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub links: DimensionLinks,
}

impl Dimension {
    /// Path id for the options sub-endpoint; falls back to the dimension
    /// name when the options link carries no id.
    pub fn options_id(&self) -> &str {
        self.links
            .options
            .as_ref()
            .and_then(|l| l.id.as_deref())
            .unwrap_or(&self.name)
    }
}

/// One valid value for a dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionOption {
    pub option: String,
    #[serde(default)]
    pub label: String,
}

/// A value assigned to a dimension in an observations query.
///
/// The wildcard is a distinguished variant rather than a magic string so
/// it cannot be confused with a legitimate option code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionValue {
    Code(String),
    Wildcard,
}

impl DimensionValue {
    pub fn code(code: impl Into<String>) -> Self {
        DimensionValue::Code(code.into())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, DimensionValue::Wildcard)
    }

    /// The query-string form; the wildcard serializes as `*`.
    pub fn as_query_value(&self) -> &str {
        match self {
            DimensionValue::Code(c) => c,
            DimensionValue::Wildcard => "*",
        }
    }
}

/// A full dimension assignment for one observations query: every dimension
/// of the target version maps to a code or the wildcard.
pub type Assignment = BTreeMap<String, DimensionValue>;

/// Raw observation record as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationRecord {
    #[serde(default, deserialize_with = "de_opt_string_from_string_or_number")]
    pub observation: Option<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, ObservationDimension>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationDimension {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservationsResponse {
    #[serde(default = "Vec::new")]
    pub observations: Vec<ObservationRecord>,
    #[serde(default)]
    pub total_observations: Option<u64>,
}

/// Tidy output row (one row = one observation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub period_id: String,
    pub period_label: String,
    pub value: f64,
}

/// Result of an observations fetch: parsed rows plus the per-record value
/// parse failures. A partial result is still usable; failures never abort
/// the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSet {
    pub rows: Vec<ObservationRow>,
    pub failures: Vec<ValueParseError>,
}

impl ObservationSet {
    /// Flatten the server's nested per-observation structure. Records
    /// without a time dimension are skipped; records whose value does not
    /// parse as a float land in `failures`.
    pub fn from_response(resp: ObservationsResponse) -> Self {
        let mut set = ObservationSet::default();
        for record in resp.observations {
            let Some(time) = record
                .dimensions
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("time"))
                .map(|(_, d)| d)
            else {
                continue;
            };
            let raw = record.observation.unwrap_or_default();
            match raw.trim().parse::<f64>() {
                Ok(value) => set.rows.push(ObservationRow {
                    period_id: time.id.clone(),
                    period_label: time.label.clone(),
                    value,
                }),
                Err(_) => set.failures.push(ValueParseError {
                    period_id: time.id.clone(),
                    period_label: time.label.clone(),
                    raw,
                }),
            }
        }
        set
    }

    /// Re-sort rows with a caller-supplied comparator, e.g.
    /// [`crate::period::chronological`].
    pub fn sort_rows_by<F>(&mut self, cmp: F)
    where
        F: FnMut(&ObservationRow, &ObservationRow) -> std::cmp::Ordering,
    {
        self.rows.sort_by(cmp);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Serde helper: accept a JSON string or number and normalize to `String`.
/// Observation values arrive as strings on most datasets but as numbers on
/// some; version ids vary the same way.
fn de_opt_string_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct StringOrNumber;

    impl<'de> Visitor<'de> for StringOrNumber {
        type Value = Option<String>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string, number, or null")
        }

        fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
            Ok(Some(s.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2>(self, d: D2) -> Result<Self::Value, D2::Error>
        where
            D2: serde::Deserializer<'de>,
        {
            d.deserialize_any(StringOrNumber)
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}
