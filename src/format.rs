use serde_json::Value;

use crate::arg::Arg;
use crate::error::Error;

/// Output of the record formatter, ready for a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedRecord {
    /// Human-readable message, absent when the call had no leading textual
    /// argument.
    pub message: Option<String>,
    /// JSON payload: the single value when the call carried exactly one data
    /// argument, an array in original order when it carried more.
    pub structured: Option<Value>,
    /// Cosmetic rendering of the data arguments, present only when pretty
    /// printing is enabled and at least one data argument was supplied.
    pub pretty: Option<String>,
}

/// Classify the call arguments into a message and a structured payload.
///
/// Only a leading [`Arg::Text`] becomes the message; every remaining
/// argument is data. Pure, no I/O.
pub fn format(args: Vec<Arg>, pretty: bool) -> Result<FormattedRecord, Error> {
    let mut iter = args.into_iter();
    let mut message = None;
    let mut data = Vec::new();

    match iter.next() {
        None => {}
        Some(Arg::Text(text)) => message = Some(text),
        Some(arg) => data.push(into_value(arg)?),
    }

    for arg in iter {
        data.push(into_value(arg)?);
    }

    let pretty = if pretty && !data.is_empty() {
        Some(pretty_block(&data))
    } else {
        None
    };

    let structured = if data.len() > 1 {
        Some(Value::Array(data))
    } else {
        data.pop()
    };

    Ok(FormattedRecord {
        message,
        structured,
        pretty,
    })
}

fn into_value(arg: Arg) -> Result<Value, Error> {
    match arg {
        Arg::Text(text) => Ok(Value::String(text)),
        Arg::Data(value) => Ok(value),
        Arg::Invalid(err) => Err(Error::Serialization(err)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

/// One section per data argument: the runtime type name, then an indented
/// rendering of the contents. Never parsed back, only read by humans.
fn pretty_block(values: &[Value]) -> String {
    let mut lines = Vec::new();

    for value in values {
        lines.push(type_name(value).to_string());
        pretty_lines(&mut lines, value, 1);
    }

    lines.join("\n")
}

fn pretty_lines(lines: &mut Vec<String>, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);

    match value {
        Value::Object(map) => {
            let width = map.keys().map(|key| key.chars().count()).max().unwrap_or(0);
            for (key, value) in map {
                match value {
                    Value::Object(_) | Value::Array(_) => {
                        lines.push(format!("{indent}{key:<width$} →"));
                        pretty_lines(lines, value, depth + 1);
                    }
                    scalar => lines.push(format!("{indent}{key:<width$} → {scalar}")),
                }
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::Object(_) | Value::Array(_) => {
                        lines.push(format!("{indent}[{index}]"));
                        pretty_lines(lines, item, depth + 1);
                    }
                    scalar => lines.push(format!("{indent}[{index}] {scalar}")),
                }
            }
        }
        scalar => lines.push(format!("{indent}{scalar}")),
    }
}
