use std::path::PathBuf;

use geodict_db::{Gazetteer, LoadMode};
use geodict_types::{CityQuery, GazetteerStore};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("gaz")
}

fn query<'a>(
    last_word: &'a str,
    country_code: Option<&'a str>,
    region_code: Option<&'a str>,
) -> CityQuery<'a> {
    CityQuery {
        last_word,
        candidate: last_word,
        country_code,
        region_code,
    }
}

#[test]
fn builds_country_and_region_suffix_indices() {
    let gaz = Gazetteer::load(fixture_dir()).expect("load fixtures");
    let america = gaz.country_index().get("america");
    assert_eq!(america.len(), 1);
    assert_eq!(america[0].code, "US");
    assert_eq!(gaz.country_index().get("kingdom")[0].name, "United Kingdom");

    let york = gaz.region_index().get("york");
    assert_eq!(york.len(), 1);
    assert_eq!(york[0].code, "NY");
    assert_eq!(york[0].country_code, "US");
    // "Ile-de-France" ends in "France" once hyphens split words.
    assert_eq!(gaz.region_index().get("france")[0].code, "11");
}

#[test]
fn owned_and_mmap_modes_agree() {
    let mapped = Gazetteer::load_with_mode(fixture_dir(), LoadMode::Mmap).expect("mmap");
    let owned = Gazetteer::load_with_mode(fixture_dir(), LoadMode::Owned).expect("owned");
    assert_eq!(mapped.stats(), owned.stats());
    let stats = owned.stats();
    assert_eq!(stats.countries, 4);
    assert_eq!(stats.regions, 3);
    assert_eq!(stats.cities, 6);
}

#[test]
fn city_query_prefers_most_populous_namesake() {
    let gaz = Gazetteer::load(fixture_dir()).expect("load fixtures");
    let cities = gaz.query_cities(&query("Paris", None, None)).unwrap();
    assert_eq!(cities.len(), 1);
    assert_eq!(cities["paris"].country_code.as_deref(), Some("FR"));
    assert_eq!(cities["paris"].geoname_id, 2988507);
}

#[test]
fn city_query_applies_country_and_region_filters() {
    let gaz = Gazetteer::load(fixture_dir()).expect("load fixtures");
    let texan = gaz.query_cities(&query("paris", Some("US"), None)).unwrap();
    assert_eq!(texan["paris"].geoname_id, 4717560);

    let by_region = gaz.query_cities(&query("PARIS", None, Some("tx"))).unwrap();
    assert_eq!(by_region["paris"].region_code.as_deref(), Some("TX"));

    let none = gaz.query_cities(&query("Paris", Some("ES"), None)).unwrap();
    assert!(none.is_empty());
}

#[test]
fn city_query_for_unknown_word_is_empty_and_results_are_cached() {
    let gaz = Gazetteer::load(fixture_dir()).expect("load fixtures");
    assert!(gaz.query_cities(&query("the", None, None)).unwrap().is_empty());
    assert_eq!(gaz.stats().cached_city_queries, 0);

    let first = gaz.query_cities(&query("City", None, None)).unwrap();
    let second = gaz.query_cities(&query("city", None, None)).unwrap();
    assert!(first.contains_key("new york city"));
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(gaz.stats().cached_city_queries, 1);
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("countries.tsv"), "").unwrap();
    let err = Gazetteer::load(dir.path()).err().expect("should fail");
    assert!(err.to_string().contains("regions.tsv"));
}

#[test]
fn malformed_country_line_names_file_and_line() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("countries.tsv"),
        "3017382\tFR\tFrance\t46.0\t2.0\nbad\tXX\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("regions.tsv"), "").unwrap();
    std::fs::write(dir.path().join("cities.tsv"), "").unwrap();
    let err = Gazetteer::load_with_mode(dir.path(), LoadMode::Owned)
        .err()
        .expect("should fail");
    assert!(err.to_string().contains("countries.tsv:2"));
}
