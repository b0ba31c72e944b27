use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::format::FormattedRecord;
use crate::logger::Severity;

/// Caller-supplied replacement for the default line rendering, kept for
/// call sites that already format their own lines. When configured it
/// receives only the human message; JSON and pretty augmentation are
/// skipped for that call.
pub trait LineFormatter: Send + Sync {
    fn format(
        &self,
        severity: Severity,
        time: DateTime<Utc>,
        context: Option<&str>,
        message: &str,
    ) -> String;
}

impl<F> LineFormatter for F
where
    F: Fn(Severity, DateTime<Utc>, Option<&str>, &str) -> String + Send + Sync,
{
    fn format(
        &self,
        severity: Severity,
        time: DateTime<Utc>,
        context: Option<&str>,
        message: &str,
    ) -> String {
        self(severity, time, context, message)
    }
}

fn level_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug => "\x1b[0;34m",
        Severity::Info => "\x1b[0;32m",
        Severity::Warn => "\x1b[0;33m",
        Severity::Error => "\x1b[0;31m",
        Severity::Fatal => "\x1b[0;35m",
    }
}

/// Render a record into the final text block: severity-labelled message
/// line, compact JSON line, pretty block. No timestamp here, the
/// destination is expected to supply its own.
pub(crate) fn render(severity: Severity, record: &FormattedRecord, use_ansi: bool) -> String {
    let mut out = if use_ansi {
        format!("{}{}:\x1b[0m", level_color(severity), severity)
    } else {
        format!("{severity}:")
    };

    if let Some(message) = &record.message {
        out.push(' ');
        out.push_str(message);
    }

    if let Some(structured) = &record.structured {
        out.push('\n');
        out.push_str(&structured_line(structured, record.message.as_deref()));
    }

    if let Some(pretty) = &record.pretty {
        out.push('\n');
        out.push_str(pretty);
    }

    out
}

/// Compact JSON line for the structured payload. When the payload is a map
/// and the call carried a message, the message is injected as an extra
/// `"message"` field without overwriting an existing key, so the line stays
/// grep-able on its own. Arrays and scalars are left untouched and the
/// message stays on the first line only.
pub(crate) fn structured_line(structured: &Value, message: Option<&str>) -> String {
    match (structured, message) {
        (Value::Object(map), Some(message)) if !map.contains_key("message") => {
            let mut merged = map.clone();
            merged.insert("message".to_string(), Value::String(message.to_string()));
            Value::Object(merged).to_string()
        }
        _ => structured.to_string(),
    }
}
