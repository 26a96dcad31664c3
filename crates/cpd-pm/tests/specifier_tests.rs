//! Integration tests for dependency specifier parsing
//!
//! Covers the accepted grammar, the rejected inputs and canonical composition.

use cpd_pm::{
    parse_dependency_specifier, DependencySpecifier, SemanticVersion,
    SemanticVersionWithOptionalParts, SpecifierError, VersionSpecBound, VersionSpecBoundOperand,
    VersionSpecType,
};

fn bound(
    operand: VersionSpecBoundOperand,
    major: u64,
    minor: Option<u64>,
    patch: Option<u64>,
) -> VersionSpecBound {
    VersionSpecBound {
        operand,
        version: SemanticVersionWithOptionalParts::new(major, minor, patch).unwrap(),
    }
}

#[test]
fn test_accepts_name_only() {
    let parts = parse_dependency_specifier("cpd").unwrap();
    assert_eq!(parts.repository, None);
    assert_eq!(parts.name, "cpd");
    assert_eq!(parts.version_spec, VersionSpecType::Latest);
}

#[test]
fn test_accepts_repository() {
    let parts = parse_dependency_specifier("repo/cpd").unwrap();
    assert_eq!(parts.repository.as_deref(), Some("repo"));
    assert_eq!(parts.name, "cpd");
    assert_eq!(parts.version_spec, VersionSpecType::Latest);
}

#[test]
fn test_accepts_exact_version() {
    let parts = parse_dependency_specifier("cpd[1.2.3]").unwrap();
    assert_eq!(
        parts.version_spec,
        VersionSpecType::Exact(SemanticVersion::new(1, 2, 3))
    );
}

#[test]
fn test_accepts_bounds_in_order() {
    let parts = parse_dependency_specifier("cpd[>1,<=2.0]").unwrap();
    assert_eq!(
        parts.version_spec,
        VersionSpecType::Bounds(vec![
            bound(VersionSpecBoundOperand::GreaterThan, 1, None, None),
            bound(VersionSpecBoundOperand::LessThanOrEqual, 2, Some(0), None),
        ])
    );
}

#[test]
fn test_accepts_documented_forms() {
    for input in [
        "boost",
        "boost[latest]",
        "official/boost[1.2.3]",
        "boost[>=1.0]",
        "official/boost[>=1.5,<2.0]",
        "boost[<1.2.3,>0]",
    ] {
        assert!(
            parse_dependency_specifier(input).is_ok(),
            "expected '{}' to parse",
            input
        );
    }
}

#[test]
fn test_rejects_malformed_input() {
    for input in [
        "",
        "[]",
        "/[]",
        "repo/cpd/another",
        "[latest]",
        "cpd[latest1]",
        "cpd[1.0]",
        "cpd[1]",
        "cpd[1.0.0.0]",
        "cpd[]",
        "cpd[=1.0.0]",
        "cpd[>=,<=]",
        "cpd[1.x.0]",
    ] {
        assert!(
            parse_dependency_specifier(input).is_err(),
            "expected '{}' to be rejected",
            input
        );
    }
}

#[test]
fn test_rejects_whitespace() {
    let err = parse_dependency_specifier("cpd [1.0.0]").unwrap_err();
    assert_eq!(
        err,
        SpecifierError::UnexpectedCharacter {
            character: ' ',
            position: 3
        }
    );
}

#[test]
fn test_unexpected_character_position() {
    let err = parse_dependency_specifier("cpd[=1.0.0]").unwrap_err();
    assert!(matches!(
        err,
        SpecifierError::UnexpectedCharacter {
            character: '=',
            position: 4
        }
    ));
}

#[test]
fn test_error_messages_name_the_problem() {
    let message = parse_dependency_specifier("cpd[1]").unwrap_err().to_string();
    assert!(message.contains("DOT"), "message was: {}", message);

    let message = parse_dependency_specifier("").unwrap_err().to_string();
    assert!(message.contains("IDENTIFIER"), "message was: {}", message);
}

#[test]
fn test_canonical_round_trip() {
    for input in [
        "cpd",
        "repo/cpd",
        "cpd[latest]",
        "cpd[1.2.3]",
        "cpd[>1,<=2.0]",
        "official/boost[>=1.5.7,<2]",
        "cpd[>=01.002]",
    ] {
        let parts = parse_dependency_specifier(input).unwrap();
        let composed = DependencySpecifier::from_parts(&parts).unwrap();
        assert_eq!(composed.parts(), &parts, "round trip of '{}'", input);
    }
}

#[test]
fn test_canonical_form_is_stable() {
    let specifier = DependencySpecifier::parse("repo/cpd").unwrap();
    let composed = DependencySpecifier::from_parts(specifier.parts()).unwrap();
    assert_eq!(composed.as_str(), "repo/cpd[latest]");

    let again = DependencySpecifier::from_parts(composed.parts()).unwrap();
    assert_eq!(again, composed);
}

#[test]
fn test_specifier_from_str() {
    let specifier: DependencySpecifier = "official/boost[>=1.5,<2.0]".parse().unwrap();
    assert_eq!(specifier.to_string(), "official/boost[>=1.5,<2.0]");
    assert_eq!(specifier.parts().name, "boost");
}
