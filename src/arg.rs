use serde::Serialize;
use serde_json::Value;

/// A single argument passed to a leveled log call.
///
/// A leading `Text` argument becomes the human-readable message. Every other
/// argument, textual or not, is classified as data and ends up in the
/// structured JSON payload.
#[derive(Debug)]
pub enum Arg {
    Text(String),
    Data(Value),
    /// Produced by [`Arg::data`] when serialization fails. Carried until the
    /// formatter runs so the error surfaces from the leveled call itself
    /// instead of from argument construction.
    Invalid(serde_json::Error),
}

impl Arg {
    /// Convert any serializable value into a structured argument.
    ///
    /// Values that cannot be represented as JSON (maps with non-string
    /// keys, serializer-rejected types) yield an argument that fails the
    /// whole call with [`Error::Serialization`](crate::Error::Serialization).
    /// Non-finite floats follow serde_json's convention and become `null`.
    pub fn data<T: Serialize + ?Sized>(value: &T) -> Arg {
        match serde_json::to_value(value) {
            Ok(value) => Arg::Data(value),
            Err(err) => Arg::Invalid(err),
        }
    }

    /// Textual argument. Only a leading one contributes the message.
    pub fn text(text: impl Into<String>) -> Arg {
        Arg::Text(text.into())
    }
}

impl From<&str> for Arg {
    fn from(text: &str) -> Arg {
        Arg::Text(text.to_string())
    }
}

impl From<String> for Arg {
    fn from(text: String) -> Arg {
        Arg::Text(text)
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Arg {
        Arg::Data(value)
    }
}
