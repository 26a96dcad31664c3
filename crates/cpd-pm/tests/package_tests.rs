//! Integration tests for package references and index validation

use cpd_pm::{
    parse_dependency_specifier, validate_package_index, IndexError, PackageRef, PackageRefError,
    SemanticVersion,
};
use std::collections::HashSet;

#[test]
fn test_package_ref_unpack() {
    let package_ref = PackageRef::parse("repo-name-1.2.3").unwrap();
    assert_eq!(
        package_ref.unpack(),
        ("repo", "name", SemanticVersion::parse("1.2.3").unwrap())
    );
}

#[test]
fn test_package_ref_rejects_short_forms() {
    assert!(PackageRef::parse("repo-name-1.2").is_err());
    assert!(PackageRef::parse("repo-name").is_err());
    assert!(matches!(
        PackageRef::parse(""),
        Err(PackageRefError::InvalidFormat(_))
    ));
}

#[test]
fn test_package_ref_string_round_trip() {
    for input in ["repo-simple_package-1.0.0", "official-boost-1.84.0", "a-b-0.0.0"] {
        let package_ref: PackageRef = input.parse().unwrap();
        assert_eq!(package_ref.to_string(), input);
        assert_eq!(PackageRef::parse(&package_ref.to_string()).unwrap(), package_ref);
    }
}

#[test]
fn test_package_ref_new_validates_names() {
    let version = SemanticVersion::new(1, 0, 0);
    assert!(PackageRef::new("official", "boost", version).is_ok());
    assert!(matches!(
        PackageRef::new("off-icial", "boost", version),
        Err(PackageRefError::InvalidRepository { .. })
    ));
    assert!(matches!(
        PackageRef::new("official", "Boost", version),
        Err(PackageRefError::InvalidName { .. })
    ));
}

#[test]
fn test_package_ref_hash_and_eq() {
    let mut set = HashSet::new();
    set.insert(PackageRef::parse("repo-a-1.0.0").unwrap());
    set.insert(PackageRef::parse("repo-a-1.0.0").unwrap());
    set.insert(PackageRef::parse("repo-a-1.0.1").unwrap());
    assert_eq!(set.len(), 2);
}

const INDEX: &str = r#"{
    "repository": "official",
    "packages": {
        "boost": {
            "versions": {
                "1.5.0": { "dependencies": ["official-zlib-1.0.0"], "sha256": "00" },
                "1.9.3": { "dependencies": ["official-zlib-1.2.0"], "sha256": "01" },
                "2.0.0": { "dependencies": [], "sha256": "02" }
            },
            "latest": "1.9.3"
        },
        "zlib": {
            "versions": {
                "1.0.0": { "sha256": "03" },
                "1.2.0": { "sha256": "04" }
            },
            "latest": "1.2.0"
        }
    }
}"#;

#[test]
fn test_index_rejects_other_repository() {
    let err = validate_package_index(INDEX.as_bytes(), "extra").unwrap_err();
    match err {
        IndexError::RepositoryMismatch { expected, found } => {
            assert_eq!(expected, "extra");
            assert_eq!(found, "official");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_index_rejects_package_without_versions() {
    let raw = r#"{"repository":"official","packages":{"boost":{"versions":{},"latest":"1.0.0"}}}"#;
    assert!(matches!(
        validate_package_index(raw.as_bytes(), "official"),
        Err(IndexError::NoVersions { .. })
    ));
}

#[test]
fn test_index_rejects_bad_dependency_reference() {
    let raw = r#"{"repository":"official","packages":{"boost":{"versions":{"1.0.0":{"dependencies":["zlib"],"sha256":"00"}},"latest":"1.0.0"}}}"#;
    assert!(matches!(
        validate_package_index(raw.as_bytes(), "official"),
        Err(IndexError::Malformed { .. })
    ));
}

#[test]
fn test_index_version_selection() {
    let index = validate_package_index(INDEX.as_bytes(), "official").unwrap();
    let select = |specifier: &str| {
        let parts = parse_dependency_specifier(specifier).unwrap();
        index
            .select_version(&parts.name, &parts.version_spec)
            .map(|v| v.to_string())
    };

    assert_eq!(select("boost").as_deref(), Some("1.9.3"));
    assert_eq!(select("boost[2.0.0]").as_deref(), Some("2.0.0"));
    assert_eq!(select("boost[>=1.5,<2.0]").as_deref(), Some("1.9.3"));
    assert_eq!(select("boost[<1.9]").as_deref(), Some("1.5.0"));
    assert_eq!(select("boost[<=2]").as_deref(), Some("2.0.0"));
    assert_eq!(select("boost[3.0.0]"), None);
    assert_eq!(select("missing"), None);
}
