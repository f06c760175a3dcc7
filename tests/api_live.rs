//! Live API smoke tests. Opt-in: `cargo test --features online`
#![cfg(feature = "online")]

use ons_rs::Client;

#[test]
fn catalogue_first_page_is_nonempty() {
    let client = Client::default();
    let first: Vec<_> = client
        .list_datasets()
        .take(5)
        .collect::<Result<_, _>>()
        .expect("catalogue page");
    assert!(!first.is_empty());
}

#[test]
fn trade_resolves_and_has_dimensions() {
    let client = Client::default();
    let vref = client.resolve_latest_version("trade").expect("resolve trade");
    let dims = client.list_dimensions(&vref).expect("dimensions");
    assert!(dims.iter().any(|d| d.name.eq_ignore_ascii_case("time")));
}
