use ons_rs::models::{Dataset, DimensionValue, Edition, ObservationsResponse, Page, Version, VersionRef};

#[test]
fn parse_dataset_with_links() {
    let sample = r#"
    {
      "id": "trade",
      "title": "UK trade in goods",
      "description": "Monthly trade in goods by country and commodity.",
      "keywords": ["trade", "exports"],
      "publisher": {"name": "Office for National Statistics"},
      "links": {
        "latest_version": {"href": "https://api.beta.ons.gov.uk/v1/datasets/trade/editions/time-series/versions/5"},
        "editions": {"href": "https://api.beta.ons.gov.uk/v1/datasets/trade/editions"}
      }
    }"#;

    let ds: Dataset = serde_json::from_str(sample).unwrap();
    assert_eq!(ds.id, "trade");
    assert_eq!(ds.keywords.len(), 2);
    assert_eq!(ds.publisher.unwrap().name, "Office for National Statistics");
    assert!(ds.links.latest_version.unwrap().href.ends_with("/versions/5"));
}

#[test]
fn edition_id_accepts_the_edition_field_name() {
    let ed: Edition = serde_json::from_str(r#"{"edition":"time-series","links":{}}"#).unwrap();
    assert_eq!(ed.id, "time-series");
}

#[test]
fn version_id_accepts_string_or_number() {
    let v: Version =
        serde_json::from_str(r#"{"version":3,"release_date":"2025-01-29T09:30:00Z"}"#).unwrap();
    assert_eq!(v.version.as_deref(), Some("3"));
    assert!(v.release_date.is_some());

    let v: Version = serde_json::from_str(r#"{"version":"3"}"#).unwrap();
    assert_eq!(v.version.as_deref(), Some("3"));
    assert!(v.release_date.is_none());
}

#[test]
fn page_total_count_is_optional() {
    let p: Page<Dataset> = serde_json::from_str(r#"{"items":[]}"#).unwrap();
    assert!(p.items.is_empty());
    assert!(p.total_count.is_none());

    let p: Page<Dataset> =
        serde_json::from_str(r#"{"items":[{"id":"a","title":"A"}],"total_count":12}"#).unwrap();
    assert_eq!(p.total_count, Some(12));
}

#[test]
fn observation_values_accept_string_or_number() {
    let sample = r#"
    {
      "observations": [
        {"observation": "603.0", "dimensions": {"Time": {"id": "Nov-25", "label": "Nov-25"}}},
        {"observation": 604.5, "dimensions": {"time": {"id": "Dec-25", "label": "Dec-25"}}}
      ],
      "total_observations": 2
    }"#;

    let resp: ObservationsResponse = serde_json::from_str(sample).unwrap();
    assert_eq!(resp.observations.len(), 2);

    let set = ons_rs::ObservationSet::from_response(resp);
    assert_eq!(set.rows.len(), 2);
    assert!(set.failures.is_empty());
    // Lower-case "time" keys are recognised too.
    assert!(set.rows.iter().any(|r| r.period_id == "Dec-25" && r.value == 604.5));
}

#[test]
fn wildcard_serializes_as_star() {
    assert_eq!(DimensionValue::Wildcard.as_query_value(), "*");
    assert_eq!(DimensionValue::code("EX").as_query_value(), "EX");
    assert!(DimensionValue::Wildcard.is_wildcard());
}

#[test]
fn version_ref_recovers_edition_and_version_from_href() {
    let vref = VersionRef::from_href(
        "trade",
        "https://api.beta.ons.gov.uk/v1/datasets/trade/editions/time-series/versions/5",
    );
    assert_eq!(vref.edition.as_deref(), Some("time-series"));
    assert_eq!(vref.version.as_deref(), Some("5"));
    assert!(vref.observations_url().ends_with("/versions/5/observations"));
    assert!(vref.dimensions_url().ends_with("/versions/5/dimensions"));
}
