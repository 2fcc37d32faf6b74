mod common;

use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::json;

use genome_portal::catalogue;
use genome_portal::domain::{RecordOutput, SearchMode};
use genome_portal::error::PortalError;
use genome_portal::portal::PortalClient;
use genome_portal::record::Catalogue;
use genome_portal::search::{SearchHits, SearchOptions};
use genome_portal::store::Store;

use common::{RoutedFetcher, credential, page, page_url, record, settings};

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

fn two_page_fetcher() -> RoutedFetcher {
    RoutedFetcher::new()
        .route(
            &page_url(1),
            page(
                json!([
                    {"id": "304fd1fb9a4e48ee", "product_id": "35638", "taxon_name": "Escherichia coli"},
                    {"id": "9a1c2e7b44d0f311", "product_id": "BAA-1025", "taxon_name": "Bacillus subtilis"}
                ]),
                json!(2),
            ),
        )
        .route(
            &page_url(2),
            page(
                json!([{"id": "b7d1e0c3aa5f2e90", "product_id": "700603", "attributes": {"biosafety_level": 2}}]),
                json!(null),
            ),
        )
}

#[test]
fn cached_catalogue_loads_back_identically() {
    let (_temp, root) = temp_root();
    let fetcher = two_page_fetcher();
    let mut client = PortalClient::new(
        &fetcher,
        credential(),
        settings(),
        Store::new_with_paths(root.join("downloads"), root.join("cache")),
    );

    let path = client.cache_catalogue(None).unwrap();
    assert_eq!(path, root.join("cache").join("catalogue.json.gz"));

    let built = client.catalogue().unwrap().clone();
    assert_eq!(built.len(), 3);
    let loaded = catalogue::load(&path).unwrap();
    assert_eq!(loaded, built);
}

#[test]
fn configured_catalogue_path_wins_over_cache_root() {
    let (_temp, root) = temp_root();
    let fetcher = two_page_fetcher();
    let configured = root.join("shared").join("portal.json.gz");
    let mut config = settings();
    config.catalogue_path = Some(configured.clone());
    let mut client = PortalClient::new(
        &fetcher,
        credential(),
        config,
        Store::new_with_paths(root.join("downloads"), root.join("cache")),
    );

    let path = client.cache_catalogue(None).unwrap();

    assert_eq!(path, configured);
    assert!(configured.as_std_path().exists());
    assert!(!root.join("cache").as_std_path().exists());
}

#[test]
fn failed_build_leaves_nothing_on_disk() {
    let (_temp, root) = temp_root();
    let fetcher = RoutedFetcher::new()
        .route(&page_url(1), page(json!([{"id": "a1"}]), json!(2)))
        .route(
            &page_url(2),
            genome_portal::http::RawResponse::new(200, "You do not have an active membership."),
        );
    let mut client = PortalClient::new(
        &fetcher,
        credential(),
        settings(),
        Store::new_with_paths(root.join("downloads"), root.join("cache")),
    );

    let err = client.cache_catalogue(None).unwrap_err();

    assert_matches!(err, PortalError::Authorization(_));
    assert!(client.catalogue().is_none());
    assert!(!root.join("cache").as_std_path().exists());
}

#[test]
fn corrupt_cache_file_is_reported() {
    let (_temp, root) = temp_root();
    let path = root.join("catalogue.json.gz");
    fs::write(path.as_std_path(), b"definitely not gzip").unwrap();

    assert_matches!(catalogue::load(&path), Err(PortalError::CatalogueCorrupt(_)));
}

#[test]
fn missing_cache_file_is_a_filesystem_error() {
    let (_temp, root) = temp_root();
    let path = root.join("absent.json.gz");

    assert_matches!(catalogue::load(&path), Err(PortalError::Filesystem(_)));
}

#[test]
fn client_search_requires_a_catalogue() {
    let fetcher = RoutedFetcher::new();
    let (_temp, root) = temp_root();
    let mut client = PortalClient::new(
        &fetcher,
        credential(),
        settings(),
        Store::new_with_paths(root.join("downloads"), root.join("cache")),
    );
    let options = SearchOptions::default();

    assert_matches!(
        client.search_catalogue("35638", &options),
        Err(PortalError::NotFound(_))
    );

    client.set_catalogue(Catalogue::new(vec![
        record(json!({"id": "304fd1fb9a4e48ee", "product_id": "35638"})),
        record(json!({"id": "9a1c2e7b44d0f311", "product_id": "BAA-1025"})),
    ]));
    let hits = client
        .search_catalogue(
            "35638",
            &SearchOptions {
                output: RecordOutput::IdOnly,
                ..options
            },
        )
        .unwrap();

    assert_eq!(
        hits,
        SearchHits::Ids(vec!["ATCC 35638:304fd1fb9a4e48ee".to_string()])
    );
    assert!(fetcher.seen().is_empty());
}

#[test]
fn loaded_catalogue_supports_fuzzy_search() {
    let (_temp, root) = temp_root();
    let path = root.join("catalogue.json.gz");
    let source = Catalogue::new(vec![
        record(json!({"id": "304fd1fb9a4e48ee", "taxon_name": "Escherichia coli"})),
        record(json!({"id": "9a1c2e7b44d0f311", "taxon_name": "Bacillus subtilis"})),
    ]);
    catalogue::persist(&source, &path).unwrap();

    let fetcher = RoutedFetcher::new();
    let mut client = PortalClient::new(
        &fetcher,
        credential(),
        settings(),
        Store::new_with_paths(root.join("downloads"), root.join("cache")),
    );
    client.load_catalogue(Some(&path)).unwrap();

    let hits = client
        .search_catalogue(
            "escherichia kole",
            &SearchOptions {
                mode: SearchMode::Fuzzy,
                ..SearchOptions::default()
            },
        )
        .unwrap();

    assert_eq!(hits.len(), 1);
}
