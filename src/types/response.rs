use std::fmt;

use serde_json::{Map, Number, Value};

use crate::Result;
use crate::ws::WsError;

/// A scalar value carried in the `data` mapping of a topic message.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// JSON number (e.g., `cpu_usage: 12.5`)
    Number(Number),
    /// JSON string (e.g., `temp_class: "warm"`)
    Text(String),
    /// JSON boolean
    Bool(bool),
}

impl FieldValue {
    /// Convert a JSON value, skipping `null`, arrays and objects.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// `0`, `""` and `false` are falsy.
    #[must_use]
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Number(n) => n.as_f64().is_none_or(|f| f == 0.0 || f.is_nan()),
            Self::Text(s) => s.is_empty(),
            Self::Bool(b) => !b,
        }
    }
}

impl fmt::Display for FieldValue {
    /// Integral floats print without a fractional part, so `30.0` renders as `30`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.is_f64() => match n.as_f64() {
                Some(v) if v == 0.0 => f.write_str("0"),
                Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                    write!(f, "{v:.0}")
                }
                Some(v) => write!(f, "{v}"),
                None => write!(f, "{n}"),
            },
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A parsed inbound frame.
///
/// Any JSON value is accepted. The recognized shape
/// `{"topic": "...", "data": {"field": value, ...}}` additionally exposes
/// [`InboundMessage::topic`] and [`InboundMessage::fields`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Topic identifier, when the frame carries a string `topic`
    pub topic: Option<String>,
    /// Scalar entries of the `data` object, when the frame carries one
    pub fields: Option<Vec<(String, FieldValue)>>,
    /// The frame as received
    pub raw: Value,
}

impl InboundMessage {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text).map_err(WsError::MessageParse)?;
        Ok(Self::from_value(raw))
    }

    #[must_use]
    pub fn from_value(raw: Value) -> Self {
        let topic = raw
            .get("topic")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        let fields = raw.get("data").and_then(Value::as_object).map(scalar_fields);

        Self { topic, fields, raw }
    }

    /// Topic and fields, when the message is routable to bound elements.
    #[must_use]
    pub fn binding(&self) -> Option<(&str, &[(String, FieldValue)])> {
        Some((self.topic.as_deref()?, self.fields.as_deref()?))
    }

    /// Look up a single field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .as_ref()?
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }
}

fn scalar_fields(data: &Map<String, Value>) -> Vec<(String, FieldValue)> {
    data.iter()
        .filter_map(|(key, value)| Some((key.clone(), FieldValue::from_json(value)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_topic_message() {
        let json = r#"{
            "topic": "fast_info",
            "data": {
                "cpu_temp": 48.3,
                "cpu_temp_percent": 56,
                "temp_class": "normal",
                "cpu_usage": 0,
                "ram_used": "1.2GB",
                "ram_percent": 30.0,
                "timestamp": "2025-01-01T12:00:00"
            }
        }"#;

        let msg = InboundMessage::parse(json).unwrap();
        assert_eq!(msg.topic.as_deref(), Some("fast_info"));

        let (topic, fields) = msg.binding().unwrap();
        assert_eq!(topic, "fast_info");
        assert_eq!(fields.len(), 7);
        assert_eq!(msg.field("cpu_usage").unwrap().to_string(), "0");
        assert_eq!(msg.field("ram_percent").unwrap().to_string(), "30");
        assert_eq!(msg.field("cpu_temp").unwrap().to_string(), "48.3");
        assert_eq!(msg.field("temp_class").unwrap().to_string(), "normal");
    }

    #[test]
    fn parse_message_without_data_is_not_routable() {
        let msg = InboundMessage::parse(r#"{"topic":"broadcast"}"#).unwrap();
        assert_eq!(msg.topic.as_deref(), Some("broadcast"));
        assert!(msg.binding().is_none());
    }

    #[test]
    fn parse_arbitrary_value() {
        let msg = InboundMessage::parse("[1, 2, 3]").unwrap();
        assert!(msg.topic.is_none());
        assert!(msg.fields.is_none());
        assert_eq!(msg.raw, json!([1, 2, 3]));
    }

    #[test]
    fn parse_invalid_frame_fails() {
        let err = InboundMessage::parse("{not json").unwrap_err();
        assert!(err.downcast_ref::<WsError>().is_some());
    }

    #[test]
    fn non_scalar_fields_are_skipped() {
        let msg = InboundMessage::from_value(json!({
            "topic": "slow_info",
            "data": { "uptime": "0 days 9 hours", "disks": [1, 2], "extra": null }
        }));
        let (_, fields) = msg.binding().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "uptime");
    }

    #[test]
    fn zero_is_falsy_but_renders() {
        let zero = FieldValue::from_json(&json!(0)).unwrap();
        assert!(zero.is_falsy());
        assert_eq!(zero.to_string(), "0");

        assert!(FieldValue::Text(String::new()).is_falsy());
        assert!(!FieldValue::Text("hot".to_owned()).is_falsy());
        assert!(!FieldValue::from_json(&json!(0.5)).unwrap().is_falsy());
    }

    #[test]
    fn fractional_numbers_keep_precision() {
        let value = FieldValue::from_json(&json!(45.5)).unwrap();
        assert_eq!(value.to_string(), "45.5");
    }
}
