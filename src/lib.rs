//! ons-rs
//!
//! A lightweight Rust library for discovering, querying, and downloading
//! data from the ONS (Office for National Statistics) beta API. Pairs with
//! the `ons` CLI.
//!
//! ### Features
//! - Walk the paginated dataset catalogue
//! - Resolve a dataset's latest edition/version (with a documented
//!   tie-break when the API offers no direct pointer)
//! - Enumerate dimensions and their valid option codes
//! - Fetch observations for a fully-specified dimension assignment and
//!   flatten them into tidy rows
//! - Save as CSV or JSON; batch-download whole series collections
//!
//! ### Example
//! ```no_run
//! use ons_rs::{Assignment, Client, DimensionValue};
//!
//! let client = Client::default();
//! let version = client.resolve_latest_version("trade")?;
//! let dims = client.list_dimensions(&version)?;
//!
//! let mut assignment = Assignment::new();
//! assignment.insert("time".into(), DimensionValue::Wildcard);
//! assignment.insert("geography".into(), DimensionValue::code("K02000001"));
//! assignment.insert("countriesandterritories".into(), DimensionValue::code("W1"));
//! assignment.insert("direction".into(), DimensionValue::code("EX"));
//! assignment.insert(
//!     "standardindustrialtradeclassification".into(),
//!     DimensionValue::code("T"),
//! );
//!
//! let obs = client.fetch_observations(&version, &ons_rs::api::dimension_names(&dims), &assignment)?;
//! ons_rs::storage::save_csv(&obs.rows, "uk_total_exports.csv")?;
//! # Ok::<(), ons_rs::Error>(())
//! ```

pub mod api;
pub mod batch;
pub mod error;
pub mod models;
pub mod period;
pub mod storage;

pub use api::Client;
pub use error::{Error, Result, ValueParseError};
pub use models::{Assignment, DimensionValue, ObservationRow, ObservationSet, VersionRef};
