//! Core value types: the event, its serialized record, and the `fire_many` argument.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Event payload. Usually a JSON object, but any value is accepted.
pub type Payload = serde_json::Value;

/// A fresh empty JSON object. Every call allocates a new one.
pub fn empty_payload() -> Payload {
    Payload::Object(serde_json::Map::new())
}

/// One occurrence: type tag, payload and the UTC instant it was created.
///
/// Fields are set once at construction and only exposed through accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    event_type: String,
    data: Payload,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current UTC time.
    pub fn new(event_type: impl Into<String>, data: Payload) -> Self {
        Self::at(event_type, data, Utc::now())
    }

    /// Create an event with a caller-supplied timestamp.
    pub fn at(event_type: impl Into<String>, data: Payload, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The two-level `{metadata, data}` form handed to listeners.
    pub fn as_record(&self) -> EventRecord {
        EventRecord {
            metadata: EventMetadata {
                event_type: self.event_type.clone(),
                timestamp: self.timestamp,
            },
            data: self.data.clone(),
        }
    }

    /// Like [`Event::as_record`], without cloning the payload.
    pub fn into_record(self) -> EventRecord {
        EventRecord {
            metadata: EventMetadata {
                event_type: self.event_type,
                timestamp: self.timestamp,
            },
            data: self.data,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Event event_type={}, data={}, timestamp={}>",
            self.event_type,
            self.data,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
        )
    }
}

/// The `metadata` group of a serialized event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
}

/// What listeners receive. Listeners get it by `&mut`; changes to `data`
/// are visible to every listener after them and to the firing caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub metadata: EventMetadata,
    pub data: Payload,
}

impl EventRecord {
    pub fn event_type(&self) -> &str {
        &self.metadata.event_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.metadata.timestamp
    }

    /// Render as `{"metadata": {"event_type", "timestamp"}, "data"}`.
    ///
    /// Same value `serde_json::to_value` gives for the record; the timestamp
    /// keeps full precision so the output deserializes back unchanged.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "metadata": &self.metadata,
            "data": &self.data,
        })
    }
}

/// Argument to [`crate::EventBus::fire_many`].
///
/// Built from any ordered collection of identifiers. A lone `&str` or
/// `String` converts too, but is kept as [`EventTypes::Bare`] so the bus can
/// reject it instead of treating `"12"` as the types `"1"` and `"2"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTypes {
    Sequence(Vec<String>),
    Bare(String),
}

impl EventTypes {
    /// The ordered identifiers, or `None` for a bare string.
    pub fn as_sequence(&self) -> Option<&[String]> {
        match self {
            EventTypes::Sequence(types) => Some(types),
            EventTypes::Bare(_) => None,
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for EventTypes {
    fn from(types: Vec<S>) -> Self {
        EventTypes::Sequence(types.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String> + Clone> From<&[S]> for EventTypes {
    fn from(types: &[S]) -> Self {
        EventTypes::Sequence(types.iter().cloned().map(Into::into).collect())
    }
}

impl<S: Into<String> + Clone> From<&Vec<S>> for EventTypes {
    fn from(types: &Vec<S>) -> Self {
        Self::from(types.as_slice())
    }
}

impl<S: Into<String> + Clone, const N: usize> From<&[S; N]> for EventTypes {
    fn from(types: &[S; N]) -> Self {
        Self::from(&types[..])
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for EventTypes {
    fn from(types: [S; N]) -> Self {
        EventTypes::Sequence(types.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for EventTypes {
    fn from(event_type: &str) -> Self {
        EventTypes::Bare(event_type.to_string())
    }
}

impl From<String> for EventTypes {
    fn from(event_type: String) -> Self {
        EventTypes::Bare(event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_empty_payload_is_fresh_object() {
        let mut a = empty_payload();
        let b = empty_payload();
        a["touched"] = json!(true);
        assert_eq!(b, json!({}));
        assert_eq!(a, json!({"touched": true}));
    }

    #[test]
    fn test_new_stamps_utc_now() {
        let before = Utc::now();
        let event = Event::new("greet", json!({}));
        let after = Utc::now();
        assert!(event.timestamp() >= before && event.timestamp() <= after);
    }

    #[test]
    fn test_record_has_metadata_and_data_groups() {
        let event = Event::at("greet", json!({"message": "Hello world!"}), fixed_ts());
        let record = event.as_record();
        assert_eq!(record.event_type(), "greet");
        assert_eq!(record.timestamp(), fixed_ts());
        assert_eq!(record.data["message"], "Hello world!");
        assert_eq!(event.into_record(), record);
    }

    #[test]
    fn test_record_json_shape() {
        let record = Event::at("new:patient", json!({"patient_id": "1"}), fixed_ts()).into_record();
        let value = record.to_json();
        assert_eq!(value["metadata"]["event_type"], "new:patient");
        assert_eq!(value["data"], json!({"patient_id": "1"}));
        assert_eq!(value.as_object().map(|o| o.len()), Some(2));
        assert_eq!(value["metadata"].as_object().map(|o| o.len()), Some(2));
    }

    #[test]
    fn test_record_json_keeps_nanosecond_timestamp() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let record = Event::at("greet", json!({"message": "hi"}), ts).into_record();

        let value = record.to_json();
        assert_eq!(value, serde_json::to_value(&record).unwrap());
        assert_eq!(value["metadata"]["timestamp"], "2023-11-14T22:13:20.123456789Z");

        let back: EventRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_non_object_payload_is_accepted() {
        let event = Event::new("count", json!(42));
        assert_eq!(event.as_record().data, json!(42));
    }

    #[test]
    fn test_display_lists_all_fields() {
        let event = Event::at("greet", json!({"a": 1}), fixed_ts());
        assert_eq!(
            event.to_string(),
            r#"<Event event_type=greet, data={"a":1}, timestamp=2024-03-01T12:30:00.000000Z>"#
        );
    }

    #[test]
    fn test_event_types_conversions() {
        assert_eq!(
            EventTypes::from(vec!["1", "2"]),
            EventTypes::Sequence(vec!["1".into(), "2".into()])
        );
        assert_eq!(
            EventTypes::from(["a", "b"]).as_sequence(),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        let owned = vec!["x".to_string()];
        assert_eq!(EventTypes::from(&owned[..]).as_sequence().map(<[_]>::len), Some(1));
        assert_eq!(EventTypes::from(&owned), EventTypes::Sequence(vec!["x".into()]));
        let array = ["p", "q"];
        assert_eq!(EventTypes::from(&array), EventTypes::from(array));
        assert_eq!(EventTypes::from("12"), EventTypes::Bare("12".into()));
        assert!(EventTypes::from(String::from("12")).as_sequence().is_none());
    }
}
