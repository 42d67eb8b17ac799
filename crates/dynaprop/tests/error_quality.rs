//! Error message quality tests.
//!
//! Ensures error messages name the property involved and that every
//! diagnostic carries a stable code and actionable help.

#![allow(clippy::pedantic)]

use std::sync::Arc;

use dynaprop::miette::Diagnostic;
use dynaprop::{Error, MemorySource, PropertyRegistry, SourceError, ValidationError, ValidatorFn};

fn code_of(diag: &dyn Diagnostic) -> Option<String> {
    diag.code().map(|c| c.to_string())
}

fn help_of(diag: &dyn Diagnostic) -> Option<String> {
    diag.help().map(|h| h.to_string())
}

// ============================================================================
// Conversion Errors
// ============================================================================

#[test]
fn test_conversion_error_names_property_value_and_type() {
    let registry = PropertyRegistry::new();
    let port = registry.get_or_create("server.port");
    port.update(Some("eighty"));

    let err = port.get(8080_u16).unwrap_err();
    let msg = err.to_string();

    assert!(msg.contains("server.port"), "missing property name: {msg}");
    assert!(msg.contains("eighty"), "missing raw value: {msg}");
    assert!(msg.contains("u16"), "missing target type: {msg}");
    assert_eq!(code_of(&err).as_deref(), Some("dynaprop::conversion_error"));
    assert!(help_of(&err).is_some());
}

#[test]
fn test_conversion_error_keeps_parse_cause() {
    let registry = PropertyRegistry::new();
    let flag = registry.get_or_create("feature.enabled");
    flag.update(Some("maybe"));

    let err = flag.get(false).unwrap_err();
    assert!(std::error::Error::source(&err).is_some());
}

// ============================================================================
// Validation Errors
// ============================================================================

#[test]
fn test_validation_error_from_source_write_is_attributed() {
    let source = Arc::new(MemorySource::new("memory"));
    let registry = PropertyRegistry::builder().source(source.clone()).build();
    let pool = registry.get_or_create("pool.size");
    pool.add_validator(ValidatorFn::new(|_| Err(ValidationError::new("must be positive"))));

    let err = source.set("pool.size", "-1").unwrap_err();

    assert_eq!(err.property, "pool.size");
    assert_eq!(
        err.to_string(),
        "validation of property 'pool.size' failed: must be positive"
    );
    assert_eq!(code_of(&err).as_deref(), Some("dynaprop::validation_error"));
}

#[test]
fn test_panicking_validator_becomes_rejection() {
    let registry = PropertyRegistry::new();
    let prop = registry.get_or_create("fragile");
    prop.add_validator(ValidatorFn::new(|_| panic!("validator bug")));

    let err = prop.validate(Some("x")).unwrap_err();
    assert_eq!(err.property, "fragile");
}

// ============================================================================
// Top-Level Error
// ============================================================================

#[test]
fn test_top_level_error_is_transparent() {
    let inner = SourceError::new("consul", "connection refused");
    let expected = inner.to_string();
    let err = Error::from(inner);

    assert_eq!(err.to_string(), expected);
    assert_eq!(code_of(&err).as_deref(), Some("dynaprop::source_error"));
    assert!(help_of(&err).is_some());
}

#[test]
fn test_report_renders_code_and_help() {
    let err = Error::from(ValidationError::new("too large").for_property("cache.size"));
    let rendered = format!("{:?}", dynaprop::miette::Report::from(err));

    assert!(rendered.contains("cache.size"), "{rendered}");
    assert!(rendered.contains("too large"), "{rendered}");
}
