//! Call and reply envelopes.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Failure text used when a reply's error carries no message.
const UNKNOWN_FAILURE: &str = "Remote call failed";

/// Identifier correlating a reply with the call that caused it.
///
/// Unique among the calls a handler has pending; never zero.
pub type CallId = u64;

/// Outgoing method invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallMessage {
    /// Correlation id chosen by the caller.
    pub id: CallId,
    /// Name of the remote method.
    pub method: String,
    /// Positional arguments. Missing on the wire means no arguments.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CallMessage {
    /// Create a call envelope.
    pub fn new(id: CallId, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            args,
        }
    }

    /// Decode a call from a payload received on the call event.
    ///
    /// # Errors
    ///
    /// Fails if the payload does not have the shape of a call.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Encode as the payload emitted on the call event.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_owned(), Value::from(self.id));
        map.insert("method".to_owned(), Value::String(self.method));
        map.insert("args".to_owned(), Value::Array(self.args));
        Value::Object(map)
    }
}

/// Description of a failed call as carried in a reply.
///
/// Decoding accepts any error value: a bare string is the message, an object
/// supplies its `message` field, and anything else is rendered as JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct ErrorInfo {
    /// Human-readable failure text reported by the remote handler.
    pub message: String,
}

impl From<Value> for ErrorInfo {
    fn from(value: Value) -> Self {
        let message = match value {
            Value::String(message) => message,
            Value::Object(mut fields) => match fields.remove("message") {
                Some(Value::String(message)) => message,
                Some(Value::Null) | None => UNKNOWN_FAILURE.to_owned(),
                Some(other) => other.to_string(),
            },
            other => other.to_string(),
        };
        Self { message }
    }
}

/// Reply to a [`CallMessage`].
///
/// Unknown fields are rejected so that a call envelope seen on a shared
/// channel never decodes as a reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplyMessage {
    /// Id of the call being answered.
    pub id: CallId,
    /// Present when the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Value returned by the handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ReplyMessage {
    /// A successful reply carrying `result`.
    #[must_use]
    pub const fn success(id: CallId, result: Value) -> Self {
        Self {
            id,
            error: None,
            result: Some(result),
        }
    }

    /// A failed reply carrying `message`.
    pub fn failure(id: CallId, message: impl Into<String>) -> Self {
        Self {
            id,
            error: Some(ErrorInfo {
                message: message.into(),
            }),
            result: None,
        }
    }

    /// Build a reply from a handler outcome.
    pub fn from_outcome(id: CallId, outcome: Result<Value, String>) -> Self {
        match outcome {
            Ok(result) => Self::success(id, result),
            Err(message) => Self::failure(id, message),
        }
    }

    /// Decode a reply from a payload received on the reply event.
    ///
    /// # Errors
    ///
    /// Fails if the payload does not have the shape of a reply.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Encode as the payload emitted on the reply event.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_owned(), Value::from(self.id));
        if let Some(error) = self.error {
            let mut info = Map::new();
            info.insert("message".to_owned(), Value::String(error.message));
            map.insert("error".to_owned(), Value::Object(info));
        }
        if let Some(result) = self.result {
            map.insert("result".to_owned(), result);
        }
        Value::Object(map)
    }

    /// What the caller sees. An error takes precedence over a result and a
    /// missing result reads as `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] when the reply carries an error.
    pub fn into_outcome(self) -> Result<Value, Error> {
        match self.error {
            Some(error) => Err(Error::Remote(error.message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_wire_shape() {
        let call = CallMessage::new(7, "add", vec![json!(3), json!(4)]);
        assert_eq!(
            call.clone().into_value(),
            json!({"id": 7, "method": "add", "args": [3, 4]})
        );
        assert_eq!(serde_json::to_value(&call).unwrap(), call.into_value());
    }

    #[test]
    fn test_call_without_args_decodes_as_empty() {
        let call = CallMessage::from_value(json!({"id": 1, "method": "ping"})).unwrap();
        assert!(call.args.is_empty());
    }

    #[test]
    fn test_reply_wire_shape() {
        assert_eq!(
            ReplyMessage::success(2, json!(7)).into_value(),
            json!({"id": 2, "result": 7})
        );
        assert_eq!(
            ReplyMessage::failure(3, "divide-by-zero").into_value(),
            json!({"id": 3, "error": {"message": "divide-by-zero"}})
        );
    }

    #[test]
    fn test_envelopes_do_not_decode_as_each_other() {
        let call = json!({"id": 1, "method": "add", "args": []});
        let reply = json!({"id": 1, "result": 7});

        assert!(ReplyMessage::from_value(call.clone()).is_err());
        assert!(CallMessage::from_value(reply).is_err());
        assert!(CallMessage::from_value(call).is_ok());
    }

    #[test]
    fn test_error_takes_precedence_over_result() {
        let reply = ReplyMessage::from_value(json!({
            "id": 4,
            "error": {"message": "boom"},
            "result": 1,
        }))
        .unwrap();
        assert_eq!(reply.into_outcome(), Err(Error::Remote("boom".to_string())));
    }

    #[test]
    fn test_missing_result_reads_as_null() {
        let reply = ReplyMessage::from_value(json!({"id": 5})).unwrap();
        assert_eq!(reply.into_outcome(), Ok(Value::Null));
    }

    #[test]
    fn test_error_info_tolerates_extra_fields() {
        let reply = ReplyMessage::from_value(json!({
            "id": 6,
            "error": {"message": "nope", "stack": "at line 1"},
        }))
        .unwrap();
        assert_eq!(reply.into_outcome().unwrap_err().to_string(), "nope");
    }

    #[test]
    fn test_error_info_accepts_loose_shapes() {
        let outcome = |error: Value| {
            ReplyMessage::from_value(json!({"id": 8, "error": error}))
                .unwrap()
                .into_outcome()
        };

        assert_eq!(
            outcome(json!({})),
            Err(Error::Remote(UNKNOWN_FAILURE.to_string()))
        );
        assert_eq!(
            outcome(json!("vault locked")),
            Err(Error::Remote("vault locked".to_string()))
        );
        assert_eq!(
            outcome(json!({"message": 404})),
            Err(Error::Remote("404".to_string()))
        );
        assert_eq!(outcome(json!(null)), Ok(Value::Null));
    }
}
