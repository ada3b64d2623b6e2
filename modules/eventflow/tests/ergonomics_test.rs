//! API surface and developer-experience tests.

use chrono::{TimeZone, Utc};
use eventflow::{Event, EventBus, EventRecord, Listener};
use serde_json::json;

// =========================================================================
// Event / EventRecord
// =========================================================================

#[test]
fn event_minimal_construction() {
    let event = Event::new("signal_discovered", json!({"title": "Test"}));
    assert_eq!(event.event_type(), "signal_discovered");
    assert_eq!(event.data()["title"], "Test");
}

#[test]
fn event_record_is_serializable() {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    let record = Event::at("new:patient", json!({"patient_id": "2"}), ts).into_record();

    let text = serde_json::to_string(&record).unwrap();
    assert!(text.contains("\"metadata\""));
    assert!(text.contains("new:patient"));

    let roundtripped: EventRecord = serde_json::from_str(&text).unwrap();
    assert_eq!(roundtripped, record);
}

#[test]
fn record_json_has_two_groups() {
    let record = Event::new("greet", json!({"message": "hi"})).into_record();
    let value = record.to_json();
    let mut top: Vec<&String> = value.as_object().unwrap().keys().collect();
    top.sort();
    assert_eq!(top, vec!["data", "metadata"]);
    assert_eq!(value["metadata"]["event_type"], "greet");
    assert!(value["metadata"]["timestamp"].as_str().unwrap().ends_with('Z'));
}

// =========================================================================
// Registration ergonomics
// =========================================================================

#[test]
fn on_returns_the_same_handle() {
    let bus = EventBus::new();
    let listener = Listener::new(|_| Ok(()));
    let returned = bus.on("t", listener.clone());
    assert_eq!(returned, listener);
    bus.unregister("t", &listener).unwrap();
    assert!(bus.is_empty());
}

#[test]
fn listen_binds_a_closure_for_later_removal() {
    let bus = EventBus::new();
    let handle = bus.listen("greet", |event| {
        assert_eq!(event.data["message"], "Hello world!");
        Ok(())
    });

    bus.fire("greet", &mut json!({"message": "Hello world!"}))
        .unwrap();
    bus.unregister("greet", &handle).unwrap();
    assert_eq!(bus.listener_count("greet"), 0);
}

#[test]
fn plain_functions_work_as_listeners() {
    fn on_patient(event: &mut EventRecord) -> anyhow::Result<()> {
        event.data["handled"] = json!(true);
        Ok(())
    }

    let bus = EventBus::new();
    bus.register("new:patient", Listener::new(on_patient));

    let mut data = json!({"patient_id": "1"});
    bus.fire("new:patient", &mut data).unwrap();
    assert_eq!(data["handled"], true);
}

#[test]
fn version_is_exposed() {
    assert!(!eventflow::VERSION.is_empty());
}

#[test]
fn bus_debug_lists_counts() {
    let bus = EventBus::default();
    bus.listen("a", |_| Ok(()));
    let debug = format!("{bus:?}");
    assert!(debug.contains("\"a\": 1"));
}
