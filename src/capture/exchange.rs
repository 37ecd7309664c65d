//! The recorded form of one proxied request/response pair.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// One completed round trip through the proxy.
///
/// Created by the forwarder once the upstream body has been fully read and
/// never mutated afterwards. Stores and broadcast messages share it through `Arc`.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    /// Path and query as received by the proxy.
    pub url: String,
    #[serde(serialize_with = "serialize_headers")]
    pub request_headers: HeaderMap,
    #[serde(serialize_with = "serialize_body")]
    pub request_body: Bytes,
    #[serde(serialize_with = "serialize_headers")]
    pub response_headers: HeaderMap,
    #[serde(serialize_with = "serialize_body")]
    pub response_body: Bytes,
    pub status_code: u16,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl Exchange {
    /// Whole milliseconds, rounded up so a completed exchange never reports zero.
    pub fn duration_ms(&self) -> u64 {
        millis_ceil(&self.duration)
    }
}

/// Header multimap as `name -> [values]`, preserving value order and duplicates.
fn serialize_headers<S: Serializer>(headers: &HeaderMap, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        map.entry(name.as_str())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map.serialize(serializer)
}

fn serialize_body<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(body))
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(millis_ceil(duration))
}

fn millis_ceil(duration: &Duration) -> u64 {
    u64::try_from(duration.as_micros().div_ceil(1000)).unwrap_or(u64::MAX)
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn serializes_wire_shape() {
        let mut exchange = fixtures::exchange("POST", "/items?page=2", 201);
        exchange
            .request_headers
            .append("x-test", HeaderValue::from_static("v1"));
        exchange
            .request_headers
            .append("x-test", HeaderValue::from_static("v2"));
        exchange.request_body = Bytes::from_static(b"abc");
        exchange.response_body = Bytes::from_static(b"{\"ok\":true}");

        let json = serde_json::to_value(&exchange).unwrap();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["url"], "/items?page=2");
        assert_eq!(json["status_code"], 201);
        assert_eq!(json["duration"], 3);
        assert_eq!(json["request_body"], "abc");
        assert_eq!(json["response_body"], "{\"ok\":true}");
        assert_eq!(json["request_headers"]["x-test"], serde_json::json!(["v1", "v2"]));
        assert_eq!(json["id"], exchange.id.to_string());
    }

    #[test]
    fn sub_millisecond_duration_rounds_up() {
        let mut exchange = fixtures::exchange("GET", "/", 200);
        exchange.duration = Duration::from_micros(250);
        assert_eq!(exchange.duration_ms(), 1);

        exchange.duration = Duration::from_millis(12);
        assert_eq!(exchange.duration_ms(), 12);
    }

    #[test]
    fn invalid_utf8_body_is_rendered_lossily() {
        let mut exchange = fixtures::exchange("GET", "/", 200);
        exchange.response_body = Bytes::from_static(b"ok\xff");

        let json = serde_json::to_value(&exchange).unwrap();
        assert_eq!(json["response_body"], "ok\u{fffd}");
    }
}
