//! Integration tests for store access
//!
//! Runs the HTTP provider against a mock server and checks that the local
//! and HTTP providers are interchangeable behind `PackageStore`.

use cpd_pm::{
    validate_package_index, FetchError, FileProvider, HttpFileProvider, LocalFileProvider,
    PackageRef, PackageStore, Platform, Progress,
};
use std::cell::RefCell;
use std::fs;
use tempfile::TempDir;

const INDEX: &str = r#"{"repository":"official","packages":{"zlib":{"versions":{"1.2.0":{"sha256":"00"}},"latest":"1.2.0"}}}"#;

fn platform() -> Platform {
    Platform::new("x86_64", "ubuntu", "22.04")
}

#[test]
fn test_http_get() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/indexes/x86_64-ubuntu-22.04/official.json")
        .with_status(200)
        .with_body(INDEX)
        .create();

    let provider = HttpFileProvider::new(&server.url()).unwrap();
    let store = PackageStore::new(Box::new(provider), platform());

    let bytes = store.get_index("official").unwrap();
    let index = validate_package_index(&bytes, "official").unwrap();
    assert!(index.package("zlib").is_some());
}

#[test]
fn test_http_not_found() {
    let mut server = mockito::Server::new();
    let _m = server.mock("GET", "/missing.json").with_status(404).create();

    let provider = HttpFileProvider::new(&server.url()).unwrap();
    assert!(matches!(
        provider.get("missing.json", None),
        Err(FetchError::NotFound(_))
    ));
}

#[test]
fn test_http_server_error() {
    let mut server = mockito::Server::new();
    let _m = server.mock("GET", "/broken.json").with_status(500).create();

    let provider = HttpFileProvider::new(&server.url()).unwrap();
    assert!(matches!(
        provider.get("broken.json", None),
        Err(FetchError::HttpStatus { status: 500, .. })
    ));
}

#[test]
fn test_http_size_limit() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/big.zip")
        .with_status(200)
        .with_body(vec![0u8; 4096])
        .create();

    let provider = HttpFileProvider::new(&server.url())
        .unwrap()
        .with_max_size(1024);
    assert!(matches!(
        provider.get("big.zip", None),
        Err(FetchError::ContentTooLarge { max: 1024, .. })
    ));
}

#[test]
fn test_http_progress() {
    let body = vec![7u8; 200 * 1024];
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/packages/x86_64-ubuntu-22.04/official/zlib-1.2.0.zip")
        .with_status(200)
        .with_body(&body)
        .create();

    let store = PackageStore::new(
        Box::new(HttpFileProvider::new(&server.url()).unwrap()),
        platform(),
    );
    let package_ref = PackageRef::parse("official-zlib-1.2.0").unwrap();

    let reports = RefCell::new(Vec::new());
    let callback = |progress: Progress| reports.borrow_mut().push(progress);
    let bytes = store.get_package_file(&package_ref, Some(&callback)).unwrap();
    assert_eq!(bytes, body);

    let reports = reports.into_inner();
    let last = reports.last().unwrap();
    assert_eq!(last.retrieved_bytes, body.len() as u64);
    assert!(reports
        .windows(2)
        .all(|pair| pair[0].retrieved_bytes <= pair[1].retrieved_bytes));
}

#[test]
fn test_local_and_http_are_interchangeable() {
    let temp = TempDir::new().unwrap();
    let listing = temp
        .path()
        .join("repositories/x86_64-ubuntu-22.04/repositories.json");
    fs::create_dir_all(listing.parent().unwrap()).unwrap();
    fs::write(&listing, r#"["official"]"#).unwrap();

    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/repositories/x86_64-ubuntu-22.04/repositories.json")
        .with_status(200)
        .with_body(r#"["official"]"#)
        .create();

    let local = PackageStore::new(Box::new(LocalFileProvider::new(temp.path())), platform());
    let remote = PackageStore::new(
        Box::new(HttpFileProvider::new(&server.url()).unwrap()),
        platform(),
    );
    assert_eq!(
        local.get_repositories().unwrap(),
        remote.get_repositories().unwrap()
    );
}
