mod common;

use common::MockApi;
use ons_rs::{Client, Error, VersionRef};
use serde_json::json;

fn client_for(server: &MockApi) -> Client {
    Client::with_base_url(server.url("/v1"))
}

fn version_ref(server: &MockApi) -> VersionRef {
    VersionRef {
        dataset: "trade".into(),
        edition: Some("time-series".into()),
        version: Some("1".into()),
        href: server.url("/v1/datasets/trade/editions/time-series/versions/1"),
    }
}

#[test]
fn dimensions_are_listed_in_api_order() {
    let server = MockApi::start();
    server.route(
        "/v1/datasets/trade/editions/time-series/versions/1/dimensions",
        &json!({
            "items": [
                {"name": "time", "label": "Time", "links": {"options": {"id": "time"}}},
                {"name": "geography", "label": "Geography", "links": {"options": {"id": "geography"}}}
            ]
        })
        .to_string(),
    );

    let dims = client_for(&server).list_dimensions(&version_ref(&server)).unwrap();
    let names: Vec<&str> = dims.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["time", "geography"]);
    assert_eq!(dims[0].options_id(), "time");
}

#[test]
fn stale_version_ref_is_version_not_found() {
    let server = MockApi::start();
    let err = client_for(&server)
        .list_dimensions(&version_ref(&server))
        .unwrap_err();
    assert!(matches!(err, Error::VersionNotFound(_)), "{err}");
}

#[test]
fn options_walk_multiple_pages_preserving_order() {
    let server = MockApi::start();
    let total = 250usize;
    let page = |range: std::ops::Range<usize>| -> String {
        let items: Vec<serde_json::Value> = range
            .map(|i| json!({"option": format!("opt{i:03}"), "label": format!("Option {i}")}))
            .collect();
        json!({"items": items, "total_count": total}).to_string()
    };
    let base = "/v1/datasets/trade/editions/time-series/versions/1/dimensions/geography/options";
    server.route(&format!("{base}?offset=0&limit=200"), &page(0..200));
    server.route(&format!("{base}?offset=200&limit=200"), &page(200..250));

    let options = client_for(&server)
        .list_options(&version_ref(&server), "geography")
        .unwrap();

    assert_eq!(options.len(), total);
    assert_eq!(options[0].option, "opt000");
    assert_eq!(options[total - 1].option, "opt249");
    assert_eq!(server.hits_for(base), 2);
}

#[test]
fn unknown_dimension_is_dimension_not_found() {
    let server = MockApi::start();
    let err = client_for(&server)
        .list_options(&version_ref(&server), "nope")
        .unwrap_err();
    assert!(matches!(err, Error::DimensionNotFound(ref d) if d == "nope"), "{err}");
    assert!(!err.is_retryable());
}
