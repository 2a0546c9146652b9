//! Canonical in-process model shared by both front ends.
//!
//! Both the gRPC messages and the browser form fields translate into these
//! types; wire-format concerns stay in `rpc` and `web`.

use serde_json::{Map, Value};

/// JSON object document, used for event data and topic schemas.
pub type JsonObject = Map<String, Value>;

/// An event as stored: datacenter and topic are storage ids that get
/// resolved to display names on the way out.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub parent_event_id: Option<String>,
    pub event_time: i64,
    pub dc_id: String,
    pub topic_id: String,
    pub tags: Vec<String>,
    pub host: String,
    pub target_hosts: Vec<String>,
    pub user: String,
    pub data: JsonObject,
}

/// An event as submitted, before the store assigns an id. Datacenter and
/// topic are referenced by name; the store resolves them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnaddedEvent {
    pub parent_event_id: Option<String>,
    pub event_time: i64,
    pub dc: String,
    pub topic_name: String,
    pub tags: Vec<String>,
    pub host: String,
    pub target_hosts: Vec<String>,
    pub user: String,
    pub data: JsonObject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub schema: JsonObject,
}

/// A topic definition as submitted on create or rename.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTopic {
    pub name: String,
    pub schema: JsonObject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dc {
    pub id: String,
    pub name: String,
}

/// Sentinel for an unbounded time bound in queries.
pub const TIME_UNBOUNDED: i64 = -1;

/// Event filter. Empty strings and empty sets mean "no filter on this
/// field"; the extra fields beyond dc/host/topic/time exist only on the
/// RPC path and are carried through to the store untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub dc: String,
    pub host: String,
    pub topic_name: String,
    pub user: String,
    pub tag_set: Vec<String>,
    pub parent_event_id: String,
    pub time_start: i64,
    pub time_end: i64,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            dc: String::new(),
            host: String::new(),
            topic_name: String::new(),
            user: String::new(),
            tag_set: Vec::new(),
            parent_event_id: String::new(),
            time_start: TIME_UNBOUNDED,
            time_end: TIME_UNBOUNDED,
        }
    }
}

/// Time-range filter for the incremental id stream.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeQuery {
    pub time_start: i64,
    pub time_end: i64,
    pub ascending: bool,
    /// <= 0 means no limit
    pub limit: i32,
}

impl Default for TimeQuery {
    fn default() -> Self {
        Self {
            time_start: TIME_UNBOUNDED,
            time_end: TIME_UNBOUNDED,
            ascending: true,
            limit: 0,
        }
    }
}

/// Decode raw bytes into a JSON object. Empty input defaults to `{}`;
/// valid JSON that is not an object is rejected like any other malformed
/// input.
pub fn decode_json_object(raw: &[u8]) -> Result<JsonObject, serde_json::Error> {
    if raw.is_empty() {
        return Ok(JsonObject::new());
    }
    serde_json::from_slice(raw)
}

/// Split a comma-separated tag string into a tag set. Empty string yields
/// an empty set.
pub fn split_tags(tags: &str) -> Vec<String> {
    if tags.is_empty() {
        return Vec::new();
    }
    tags.split(',').map(|t| t.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty_defaults_to_object() {
        let data = decode_json_object(b"").unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_decode_object() {
        let data = decode_json_object(br#"{"a": 1}"#).unwrap();
        assert_eq!(data.get("a"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode_json_object(b"{not json").is_err());
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(decode_json_object(b"[1, 2, 3]").is_err());
        assert!(decode_json_object(b"42").is_err());
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("a,b,c"), vec!["a", "b", "c"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_query_defaults_unbounded() {
        let q = EventQuery::default();
        assert_eq!(q.time_start, TIME_UNBOUNDED);
        assert_eq!(q.time_end, TIME_UNBOUNDED);
    }
}
