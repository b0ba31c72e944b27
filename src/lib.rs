//! Structured-logging adapter: leveled log calls whose extra arguments are
//! serialized as JSON instead of being interpolated into the message text,
//! so a log-indexing backend can query them by field while the lines stay
//! readable on a terminal or in a local file.
//!
//! A leading string argument becomes the human message; every other
//! argument is structured data. Records go either to a local stream or to a
//! CloudWatch-style remote destination behind the [`Transport`] boundary.
//!
//! ```
//! use cwlog::{Arg, Logger, Severity};
//! use serde_json::json;
//!
//! let logger = Logger::builder()
//!     .with_min_severity(Severity::Debug)
//!     .with_stderr_sink()
//!     .build()?;
//!
//! logger.debug([
//!     Arg::from("Starting to process order."),
//!     Arg::from(json!({ "id": "1234" })),
//! ])?;
//! // DEBUG: Starting to process order.
//! // {"id":"1234","message":"Starting to process order."}
//! # Ok::<(), cwlog::Error>(())
//! ```

mod arg;
mod cloudwatch;
mod error;
mod format;
mod logger;
mod remote;
mod render;
mod sinks;

pub use arg::Arg;
pub use cloudwatch::{CloudWatchTransport, CloudWatchTransportBuilder};
pub use error::Error;
pub use format::FormattedRecord;
pub use logger::{
    debug, error, fatal, global, info, init_global, warn, Builder, Logger, Outcome, Severity,
};
pub use remote::{DestinationHandle, LogEvent, Transport};
pub use render::LineFormatter;
pub use sinks::{LogSink, NullSink, RemoteSink, StreamSink};
