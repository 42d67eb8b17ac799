//! Scenario tests driving a registry through raw source events.
//!
//! The scripted source below lets each test set the values the registry
//! pulls and fire listener events by hand, so every step of the event
//! translation can be observed in isolation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use dynaprop::{
    ManualClock, Property, PropertyEventListener, PropertyRegistry, PropertySource, SourceError,
    ValidationError, ValidatorFn,
};
use parking_lot::{Mutex, RwLock};

const PROP_ONE: &str = "prop1";
const PROP_TWO: &str = "prop2";
const PROP_THREE: &str = "prop3";

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Default)]
struct ScriptedSource {
    values: RwLock<HashMap<String, String>>,
    listener: Mutex<Option<Arc<dyn PropertyEventListener>>>,
    failing: RwLock<Option<String>>,
}

impl ScriptedSource {
    fn set_values(&self, values: &[(&str, &str)]) {
        *self.values.write() = values
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
    }

    fn fail_reads_of(&self, name: &str) {
        *self.failing.write() = Some(name.to_string());
    }

    fn listener(&self) -> Arc<dyn PropertyEventListener> {
        self.listener
            .lock()
            .clone()
            .expect("registry should have registered a listener")
    }
}

impl PropertySource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn get_string(&self, name: &str) -> Result<Option<String>, SourceError> {
        if self.failing.read().as_deref() == Some(name) {
            return Err(SourceError::new("scripted", "backend unavailable"));
        }
        Ok(self.values.read().get(name).cloned())
    }

    fn add_listener(&self, listener: Arc<dyn PropertyEventListener>) {
        *self.listener.lock() = Some(listener);
    }
}

struct Fixture {
    registry: PropertyRegistry,
    source: Arc<ScriptedSource>,
    clock: Arc<ManualClock>,
}

impl Fixture {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(at(0)));
        let source = Arc::new(ScriptedSource::default());
        let registry = PropertyRegistry::builder()
            .clock(clock.clone())
            .source(source.clone())
            .build();

        Self {
            registry,
            source,
            clock,
        }
    }
}

/// 2016-07-20T12:00:00Z plus `days`.
fn at(days: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_469_016_000 + days * 86_400)
}

fn count_changes(property: &Property) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    property.add_callback(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    count
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_new_property_is_absent() {
    let fx = Fixture::new();
    let prop = fx.registry.get_or_create(PROP_ONE);

    assert_eq!(prop.get_string(None), None);
    assert_eq!(prop.get_string(Some("default")).as_deref(), Some("default"));
}

#[test]
fn test_source_loaded_updates_value_and_timestamp() {
    let fx = Fixture::new();
    let prop = fx.registry.get_or_create(PROP_ONE);
    let changes = count_changes(&prop);

    fx.source.set_values(&[(PROP_ONE, "value1")]);
    fx.clock.set(at(1));
    fx.source.listener().on_source_loaded("scripted");

    assert_eq!(prop.get_string(None).as_deref(), Some("value1"));
    assert_eq!(prop.updated_at(), at(1));
    assert_eq!(changes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_existing_value_added_is_noop() {
    let fx = Fixture::new();
    let prop = fx.registry.get_or_create(PROP_ONE);

    fx.source.set_values(&[(PROP_ONE, "value1")]);
    fx.clock.set(at(0));
    fx.source.listener().on_source_loaded("scripted");

    let changes = count_changes(&prop);
    fx.clock.set(at(6));
    fx.source
        .listener()
        .on_property_added("scripted", PROP_ONE, Some("value1"));

    assert_eq!(prop.get_string(None).as_deref(), Some("value1"));
    assert_eq!(prop.updated_at(), at(0));
    assert_eq!(changes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_new_value_updated_creates_and_commits() {
    let fx = Fixture::new();
    fx.clock.set(at(2));

    fx.source
        .listener()
        .on_property_updated("scripted", PROP_ONE, Some("value1"));

    let prop = fx
        .registry
        .get(PROP_ONE)
        .expect("update event should create the property");
    assert_eq!(prop.get_string(None).as_deref(), Some("value1"));
    assert_eq!(prop.updated_at(), at(2));
}

#[test]
fn test_removed_value_becomes_absent() {
    let fx = Fixture::new();
    fx.source.set_values(&[(PROP_ONE, "value1")]);
    let prop = fx.registry.get_or_create(PROP_ONE);
    assert_eq!(prop.get_string(None).as_deref(), Some("value1"));

    let changes = count_changes(&prop);
    fx.clock.set(at(3));
    fx.source.set_values(&[]);
    fx.source.listener().on_property_removed("scripted", PROP_ONE);

    assert_eq!(prop.get_string(None), None);
    assert_eq!(prop.updated_at(), at(3));
    assert_eq!(changes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_removed_unknown_value_creates_nothing() {
    let fx = Fixture::new();
    fx.source.listener().on_property_removed("scripted", "ghost");
    assert!(fx.registry.get("ghost").is_none());
}

#[test]
fn test_cleared_reverts_every_property() {
    let fx = Fixture::new();
    let props: Vec<_> = [PROP_ONE, PROP_TWO, PROP_THREE]
        .iter()
        .map(|name| fx.registry.get_or_create(name))
        .collect();

    fx.source
        .set_values(&[(PROP_ONE, "1"), (PROP_TWO, "2"), (PROP_THREE, "3")]);
    fx.source.listener().on_source_loaded("scripted");

    let counters: Vec<_> = props.iter().map(|p| count_changes(p)).collect();

    fx.clock.set(at(4));
    fx.source.set_values(&[]);
    fx.source.listener().on_properties_cleared("scripted");

    for (prop, changes) in props.iter().zip(&counters) {
        assert_eq!(prop.get_string(None), None, "{}", prop.name());
        assert_eq!(prop.updated_at(), at(4), "{}", prop.name());
        assert_eq!(changes.load(Ordering::SeqCst), 1, "{}", prop.name());
    }
}

#[test]
fn test_updating_runs_validators() {
    let fx = Fixture::new();
    let prop = fx.registry.get_or_create(PROP_ONE);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    prop.add_validator(ValidatorFn::new(move |value| {
        s.lock().push(value.map(str::to_string));
        Ok(())
    }));

    fx.source
        .listener()
        .on_updating_property("scripted", PROP_ONE, None)
        .unwrap();
    fx.source
        .listener()
        .on_adding_property("scripted", PROP_ONE, Some("x"))
        .unwrap();

    assert_eq!(*seen.lock(), vec![None, Some("x".to_string())]);
}

#[test]
fn test_rejection_reaches_the_source() {
    let fx = Fixture::new();
    let prop = fx.registry.get_or_create(PROP_ONE);
    prop.add_validator(ValidatorFn::new(|_| Err(ValidationError::new("frozen"))));

    let err = fx
        .source
        .listener()
        .on_updating_property("scripted", PROP_ONE, Some("v"))
        .unwrap_err();

    assert_eq!(err.property, PROP_ONE);
    assert_eq!(err.message, "frozen");
    assert_eq!(prop.raw_value(), None);
}

#[test]
fn test_removal_is_not_validated() {
    let fx = Fixture::new();
    let prop = fx.registry.get_or_create(PROP_ONE);
    prop.add_validator(ValidatorFn::new(|_| Err(ValidationError::new("never"))));

    assert!(fx
        .source
        .listener()
        .on_removing_property("scripted", PROP_ONE, Some("v"))
        .is_ok());
    assert!(fx
        .source
        .listener()
        .on_clearing_properties("scripted")
        .is_ok());
}

#[test]
fn test_failing_source_read_leaves_property_unchanged() {
    let fx = Fixture::new();
    fx.source.set_values(&[(PROP_ONE, "1"), (PROP_TWO, "2")]);
    let one = fx.registry.get_or_create(PROP_ONE);
    let two = fx.registry.get_or_create(PROP_TWO);

    fx.source.set_values(&[(PROP_ONE, "10"), (PROP_TWO, "20")]);
    fx.source.fail_reads_of(PROP_ONE);

    assert_eq!(fx.registry.refresh_all(), 1);
    assert_eq!(one.raw_value().as_deref(), Some("1"));
    assert_eq!(two.raw_value().as_deref(), Some("20"));
}

#[test]
fn test_conversion_failure_repeats_until_value_changes() {
    let fx = Fixture::new();
    let prop = fx.registry.get_or_create(PROP_ONE);
    prop.update(Some("not a number"));

    for _ in 0..3 {
        let err = prop.get(0_i32).unwrap_err();
        assert_eq!(err.value, "not a number");
    }

    prop.update(Some("42"));
    assert_eq!(prop.get(0_i32).unwrap(), 42);
}

// ============================================================================
// Without A Source
// ============================================================================

#[test]
fn test_without_source_properties_only_change_directly() {
    let registry = PropertyRegistry::new();
    let prop = registry.get_or_create(PROP_ONE);

    assert_eq!(registry.refresh_all(), 0);
    assert_eq!(prop.get_string(Some("fallback")).as_deref(), Some("fallback"));

    assert!(registry.update_property(PROP_ONE, Some("direct")));
    assert_eq!(prop.get_string(None).as_deref(), Some("direct"));
}

#[test]
fn test_reset_starts_fresh() {
    let fx = Fixture::new();
    let before = fx.registry.get_or_create(PROP_ONE);
    let old_listener = fx.source.listener();

    fx.registry.reset();
    old_listener.on_property_updated("scripted", PROP_ONE, Some("late"));

    assert!(fx.registry.is_empty());
    assert_eq!(before.raw_value(), None);
}
