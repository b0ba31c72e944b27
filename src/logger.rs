use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use crate::arg::Arg;
use crate::error::Error;
use crate::format::{self, FormattedRecord};
use crate::remote::Transport;
use crate::render::LineFormatter;
use crate::sinks::{LogSink, NullSink, RemoteSink, RenderConfig, StreamSink};

/// Log call priority. Calls below the configured minimum are suppressed
/// before any formatting or I/O happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn from_u8(raw: u8) -> Severity {
        match raw {
            0 => Severity::Debug,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a leveled call did: either the record that was handed to the sink,
/// or `Suppressed` when the call fell below the severity threshold.
/// Suppression is not an error.
#[derive(Debug)]
pub enum Outcome {
    Emitted(FormattedRecord),
    Suppressed,
}

impl Outcome {
    pub fn is_emitted(&self) -> bool {
        matches!(self, Outcome::Emitted(_))
    }

    pub fn record(&self) -> Option<&FormattedRecord> {
        match self {
            Outcome::Emitted(record) => Some(record),
            Outcome::Suppressed => None,
        }
    }
}

pub struct Logger {
    min_severity: AtomicU8,
    pretty: bool,
    sink: Box<dyn LogSink>,
}

impl Logger {
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Severity gate: pure threshold comparison, no side effects.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.min_severity()
    }

    pub fn min_severity(&self) -> Severity {
        Severity::from_u8(self.min_severity.load(Ordering::Relaxed))
    }

    /// The threshold may be adjusted after construction; everything else
    /// about the logger is fixed.
    pub fn set_min_severity(&self, severity: Severity) {
        self.min_severity.store(severity as u8, Ordering::Relaxed);
    }

    /// Common path behind the leveled methods: gate, format, deliver.
    pub fn log(
        &self,
        severity: Severity,
        args: impl Into<Vec<Arg>>,
    ) -> Result<Outcome, Error> {
        if !self.enabled(severity) {
            return Ok(Outcome::Suppressed);
        }

        let record = format::format(args.into(), self.pretty)?;
        self.sink.emit(severity, &record)?;
        Ok(Outcome::Emitted(record))
    }

    pub fn debug(&self, args: impl Into<Vec<Arg>>) -> Result<Outcome, Error> {
        self.log(Severity::Debug, args)
    }

    pub fn info(&self, args: impl Into<Vec<Arg>>) -> Result<Outcome, Error> {
        self.log(Severity::Info, args)
    }

    pub fn warn(&self, args: impl Into<Vec<Arg>>) -> Result<Outcome, Error> {
        self.log(Severity::Warn, args)
    }

    pub fn error(&self, args: impl Into<Vec<Arg>>) -> Result<Outcome, Error> {
        self.log(Severity::Error, args)
    }

    pub fn fatal(&self, args: impl Into<Vec<Arg>>) -> Result<Outcome, Error> {
        self.log(Severity::Fatal, args)
    }

    pub fn flush(&self) -> Result<(), Error> {
        self.sink.flush()
    }
}

type SinkConstructor = Box<dyn FnOnce(RenderConfig) -> Result<Box<dyn LogSink>, Error>>;

pub struct Builder {
    min_severity: Severity,
    pretty: bool,
    use_ansi: bool,
    context: Option<String>,
    formatter: Option<Box<dyn LineFormatter>>,
    constructor: SinkConstructor,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            min_severity: Severity::Debug,
            pretty: false,
            use_ansi: false,
            context: None,
            formatter: None,
            constructor: Box::new(|config| {
                Ok(Box::new(StreamSink::stdout().with_render_config(config)))
            }),
        }
    }

    pub fn with_min_severity(self, min_severity: Severity) -> Self {
        Self {
            min_severity,
            ..self
        }
    }

    pub fn with_pretty(self, pretty: bool) -> Self {
        Self { pretty, ..self }
    }

    pub fn with_ansi(self, use_ansi: bool) -> Self {
        Self { use_ansi, ..self }
    }

    /// Label handed to a custom [`LineFormatter`] alongside severity, time
    /// and message.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
            ..self
        }
    }

    /// Replace the default line rendering for stream sinks. JSON and pretty
    /// augmentation are skipped when this is set.
    pub fn with_formatter(self, formatter: impl LineFormatter + 'static) -> Self {
        Self {
            formatter: Some(Box::new(formatter)),
            ..self
        }
    }

    pub fn with_stdout_sink(self) -> Self {
        Self {
            constructor: Box::new(|config| {
                Ok(Box::new(StreamSink::stdout().with_render_config(config)))
            }),
            ..self
        }
    }

    pub fn with_stderr_sink(self) -> Self {
        Self {
            constructor: Box::new(|config| {
                Ok(Box::new(StreamSink::stderr().with_render_config(config)))
            }),
            ..self
        }
    }

    pub fn with_writer_sink(self, writer: impl std::io::Write + Send + 'static) -> Self {
        Self {
            constructor: Box::new(move |config| {
                Ok(Box::new(StreamSink::writer(writer).with_render_config(config)))
            }),
            ..self
        }
    }

    pub fn with_file_sink(self, path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self {
            constructor: Box::new(move |config| {
                let sink = StreamSink::file(path)?;
                Ok(Box::new(sink.with_render_config(config)))
            }),
            ..self
        }
    }

    /// Send records to a remote destination instead of a local stream. The
    /// two are mutually exclusive; the last sink selection wins.
    pub fn with_remote_sink(
        self,
        destination: impl Into<String>,
        transport: impl Transport + 'static,
    ) -> Self {
        let destination = destination.into();
        Self {
            constructor: Box::new(move |_| Ok(Box::new(RemoteSink::new(destination, transport)))),
            ..self
        }
    }

    pub fn with_null_sink(self) -> Self {
        Self {
            constructor: Box::new(|_| Ok(Box::new(NullSink::new()))),
            ..self
        }
    }

    /// Install an arbitrary sink implementation.
    pub fn with_sink(self, sink: impl LogSink + 'static) -> Self {
        Self {
            constructor: Box::new(move |_| Ok(Box::new(sink))),
            ..self
        }
    }

    pub fn build(self) -> Result<Logger, Error> {
        let config = RenderConfig {
            formatter: self.formatter,
            context: self.context,
            use_ansi: self.use_ansi,
        };
        let sink = (self.constructor)(config)?;

        Ok(Logger {
            min_severity: AtomicU8::new(self.min_severity as u8),
            pretty: self.pretty,
            sink,
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Install a process-wide logger for ergonomic call sites. Init-once: a
/// second call fails with [`Error::AlreadyInitialized`]. There is nothing
/// to tear down beyond the sink's stream or client handle.
pub fn init_global(logger: Logger) -> Result<(), Error> {
    GLOBAL.set(logger).map_err(|_| Error::AlreadyInitialized)
}

pub fn global() -> Option<&'static Logger> {
    GLOBAL.get()
}

macro_rules! global_leveled {
    ($($(#[$meta:meta])* $name:ident => $severity:expr),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(args: impl Into<Vec<Arg>>) -> Result<Outcome, Error> {
                match global() {
                    Some(logger) => logger.log($severity, args),
                    None => Ok(Outcome::Suppressed),
                }
            }
        )*
    };
}

global_leveled! {
    /// Log at DEBUG through the process-wide logger; a no-op before
    /// [`init_global`].
    debug => Severity::Debug,
    /// Log at INFO through the process-wide logger; a no-op before
    /// [`init_global`].
    info => Severity::Info,
    /// Log at WARN through the process-wide logger; a no-op before
    /// [`init_global`].
    warn => Severity::Warn,
    /// Log at ERROR through the process-wide logger; a no-op before
    /// [`init_global`].
    error => Severity::Error,
    /// Log at FATAL through the process-wide logger; a no-op before
    /// [`init_global`].
    fatal => Severity::Fatal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingSink {
        emitted: Mutex<Vec<(Severity, FormattedRecord)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                emitted: Mutex::new(Vec::new()),
            }
        }
    }

    impl LogSink for RecordingSink {
        fn emit(&self, severity: Severity, record: &FormattedRecord) -> Result<(), Error> {
            self.emitted.lock().unwrap().push((severity, record.clone()));
            Ok(())
        }

        fn flush(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn severities_are_totally_ordered() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn calls_below_the_threshold_are_suppressed_without_sink_io() {
        let sink = std::sync::Arc::new(RecordingSink::new());
        let logger = Logger::builder()
            .with_min_severity(Severity::Info)
            .with_sink(SharedSink(sink.clone()))
            .build()
            .unwrap();

        let outcome = logger.debug([Arg::from("quiet")]).unwrap();
        assert!(!outcome.is_emitted());
        assert!(sink.emitted.lock().unwrap().is_empty());

        let outcome = logger.info([Arg::from("loud")]).unwrap();
        assert!(outcome.is_emitted());
        assert_eq!(sink.emitted.lock().unwrap().len(), 1);
    }

    #[test]
    fn filtering_changes_only_the_severity_label() {
        let args = || {
            vec![
                Arg::from("processing"),
                Arg::from(json!({ "id": "1234" })),
            ]
        };

        let debug_sink = std::sync::Arc::new(RecordingSink::new());
        let debug_logger = Logger::builder()
            .with_sink(SharedSink(debug_sink.clone()))
            .build()
            .unwrap();
        debug_logger.debug(args()).unwrap();

        let info_sink = std::sync::Arc::new(RecordingSink::new());
        let info_logger = Logger::builder()
            .with_min_severity(Severity::Info)
            .with_sink(SharedSink(info_sink.clone()))
            .build()
            .unwrap();
        info_logger.info(args()).unwrap();

        let debug_emitted = debug_sink.emitted.lock().unwrap();
        let info_emitted = info_sink.emitted.lock().unwrap();

        assert_eq!(debug_emitted[0].0, Severity::Debug);
        assert_eq!(info_emitted[0].0, Severity::Info);
        assert_eq!(debug_emitted[0].1, info_emitted[0].1);
    }

    #[test]
    fn threshold_is_adjustable_after_construction() {
        let logger = Logger::builder().with_null_sink().build().unwrap();
        assert!(logger.enabled(Severity::Debug));

        logger.set_min_severity(Severity::Error);
        assert!(!logger.enabled(Severity::Warn));
        assert!(logger.enabled(Severity::Error));
        assert_eq!(logger.min_severity(), Severity::Error);
    }

    #[test]
    fn serialization_failure_surfaces_from_the_leveled_call() {
        let logger = Logger::builder().with_null_sink().build().unwrap();

        let bad = std::collections::HashMap::from([((1u8, 2u8), 3u8)]);
        let result = logger.info([Arg::from("msg"), Arg::data(&bad)]);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn emitted_outcome_carries_the_record_for_chaining() {
        let logger = Logger::builder().with_null_sink().build().unwrap();

        let outcome = logger
            .warn([Arg::from("msg"), Arg::from(json!({ "id": "1" }))])
            .unwrap();

        let record = outcome.record().unwrap();
        assert_eq!(record.message.as_deref(), Some("msg"));
        assert_eq!(record.structured, Some(json!({ "id": "1" })));
    }

    #[test]
    fn global_registry_initializes_once() {
        // Free functions are quiet no-ops while nothing is installed.
        let outcome = debug([Arg::from("early")]).unwrap();
        assert!(!outcome.is_emitted());

        let logger = Logger::builder().with_null_sink().build().unwrap();
        init_global(logger).unwrap();
        assert!(global().is_some());

        let outcome = info([Arg::from("hello")]).unwrap();
        assert!(outcome.is_emitted());

        let second = Logger::builder().with_null_sink().build().unwrap();
        assert!(matches!(
            init_global(second),
            Err(Error::AlreadyInitialized)
        ));
    }

    struct SharedSink(std::sync::Arc<RecordingSink>);

    impl LogSink for SharedSink {
        fn emit(&self, severity: Severity, record: &FormattedRecord) -> Result<(), Error> {
            self.0.emit(severity, record)
        }

        fn flush(&self) -> Result<(), Error> {
            self.0.flush()
        }
    }
}
