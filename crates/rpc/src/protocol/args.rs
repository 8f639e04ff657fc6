//! Positional argument lists.

use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Arguments received by a method handler.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    /// Wrap a list of argument values.
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Encode caller-side arguments into a positional list.
    ///
    /// Anything serializing to an array is taken element-wise, so tuples and
    /// vectors both work. `()` and `None` mean no arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArguments`] if `args` fails to serialize or
    /// serializes to something other than an array or `null`.
    pub fn encode(args: impl Serialize) -> Result<Vec<Value>> {
        match serde_json::to_value(args).map_err(|e| Error::InvalidArguments(e.to_string()))? {
            Value::Array(values) => Ok(values),
            Value::Null => Ok(Vec::new()),
            other => Err(Error::InvalidArguments(format!(
                "expected an argument list, got {other}"
            ))),
        }
    }

    /// Decode the whole list, typically into a tuple.
    ///
    /// An empty list also decodes into `()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArguments`] if the list does not fit `T`.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T> {
        let empty = self.0.is_empty();
        match serde_json::from_value(Value::Array(self.0)) {
            Ok(parsed) => Ok(parsed),
            Err(_) if empty => serde_json::from_value(Value::Null)
                .map_err(|e| Error::InvalidArguments(e.to_string())),
            Err(e) => Err(Error::InvalidArguments(e.to_string())),
        }
    }

    /// Decode the argument at `index`. A missing argument reads as `null`,
    /// so optional trailing arguments can be requested as `Option<T>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArguments`] if the argument does not fit `T`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let value = self.0.get(index).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
            .map_err(|e| Error::InvalidArguments(format!("argument {index}: {e}")))
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no arguments were passed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
