use std::io::{LineWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;

use crate::error::Error;
use crate::format::FormattedRecord;
use crate::logger::Severity;
use crate::remote::{LogEvent, RemoteStream, Transport};
use crate::render::{self, LineFormatter};

/// Delivery target for formatted records.
pub trait LogSink: Send + Sync {
    fn emit(&self, severity: Severity, record: &FormattedRecord) -> Result<(), Error>;
    fn flush(&self) -> Result<(), Error>;
}

/// Rendering knobs handed from the builder to stream sinks.
pub(crate) struct RenderConfig {
    pub formatter: Option<Box<dyn LineFormatter>>,
    pub context: Option<String>,
    pub use_ansi: bool,
}

/// Writes rendered text blocks to a local stream. A failed write is fatal
/// to the call, there is no fallback destination.
pub struct StreamSink {
    writer: Mutex<Box<dyn Write + Send>>,
    formatter: Option<Box<dyn LineFormatter>>,
    context: Option<String>,
    use_ansi: bool,
}

impl StreamSink {
    pub fn stdout() -> Self {
        Self::writer(std::io::stdout())
    }

    pub fn stderr() -> Self {
        Self::writer(std::io::stderr())
    }

    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            formatter: None,
            context: None,
            use_ansi: false,
        }
    }

    /// Open `path` for appending and log there.
    pub fn file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;

        Ok(Self::writer(LineWriter::new(file)))
    }

    pub(crate) fn with_render_config(mut self, config: RenderConfig) -> Self {
        self.formatter = config.formatter;
        self.context = config.context;
        self.use_ansi = config.use_ansi;
        self
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, Box<dyn Write + Send>>, Error> {
        self.writer
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("log writer mutex poisoned")))
    }
}

impl LogSink for StreamSink {
    fn emit(&self, severity: Severity, record: &FormattedRecord) -> Result<(), Error> {
        // A configured formatter fully replaces the default rendering and
        // only ever sees the message text.
        let block = match &self.formatter {
            Some(formatter) => formatter.format(
                severity,
                Utc::now(),
                self.context.as_deref(),
                record.message.as_deref().unwrap_or(""),
            ),
            None => render::render(severity, record, self.use_ansi),
        };

        let mut writer = self.lock_writer()?;
        writeln!(writer, "{block}")?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        self.lock_writer()?.flush()?;
        Ok(())
    }
}

/// Hands `(timestamp, message, structured)` to the remote transport, tagged
/// with the configured destination name. Synchronous: the leveled call does
/// not return until the append succeeded or failed.
pub struct RemoteSink {
    destination: String,
    transport: Box<dyn Transport>,
    stream: Mutex<RemoteStream>,
}

impl RemoteSink {
    pub fn new(destination: impl Into<String>, transport: impl Transport + 'static) -> Self {
        Self {
            destination: destination.into(),
            transport: Box::new(transport),
            stream: Mutex::new(RemoteStream::new()),
        }
    }
}

impl LogSink for RemoteSink {
    fn emit(&self, _severity: Severity, record: &FormattedRecord) -> Result<(), Error> {
        if record.message.is_none() && record.structured.is_none() {
            // Nothing to deliver.
            return Ok(());
        }

        let event = LogEvent {
            timestamp: Utc::now().timestamp_millis(),
            message: record.message.clone(),
            structured: record.structured.clone(),
        };

        // The continuation token is read-modify-write against the remote
        // API, so concurrent emitters must not interleave here.
        let mut stream = self
            .stream
            .lock()
            .map_err(|_| Error::Destination("remote stream mutex poisoned".to_string()))?;

        stream.append(self.transport.as_ref(), &self.destination, &[event])
    }

    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Drops everything. Useful to disable logging without touching call sites.
pub struct NullSink;

impl NullSink {
    pub fn new() -> Self {
        NullSink
    }
}

impl Default for NullSink {
    fn default() -> Self {
        NullSink::new()
    }
}

impl LogSink for NullSink {
    fn emit(&self, _severity: Severity, _record: &FormattedRecord) -> Result<(), Error> {
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
