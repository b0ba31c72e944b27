use aws_config::retry::RetryConfig;
use aws_config::Region;
use aws_sdk_cloudwatchlogs as cloudwatchlogs;
use aws_sdk_cloudwatchlogs::operation::put_log_events::PutLogEventsError;
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use serde_json::Value;
use tokio::runtime::Runtime;

use crate::error::Error;
use crate::remote::{DestinationHandle, LogEvent, Transport};
use crate::render;

/// CloudWatch Logs implementation of [`Transport`].
///
/// The sink surface is synchronous, so the adapter owns a current-thread
/// runtime and blocks on the SDK futures. SDK-level retries stay at the
/// standard policy; the single stale-token retry lives in the sink.
pub struct CloudWatchTransport {
    client: cloudwatchlogs::Client,
    runtime: Runtime,
    stream_name: String,
}

impl CloudWatchTransport {
    pub fn builder() -> CloudWatchTransportBuilder {
        CloudWatchTransportBuilder::new()
    }
}

pub struct CloudWatchTransportBuilder {
    profile_name: Option<String>,
    region: Option<String>,
    stream_name: Option<String>,
    retry_config: RetryConfig,
}

impl CloudWatchTransportBuilder {
    pub fn new() -> Self {
        Self {
            profile_name: None,
            region: None,
            stream_name: None,
            retry_config: RetryConfig::standard(),
        }
    }

    pub fn use_profile_name(mut self, profile_name: Option<String>) -> Self {
        self.profile_name = profile_name;
        self
    }

    pub fn use_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Log-stream name within the destination group. Defaults to a
    /// per-process name so concurrent processes do not contend for one
    /// stream's token.
    pub fn use_stream_name(mut self, stream_name: impl Into<String>) -> Self {
        self.stream_name = Some(stream_name.into());
        self
    }

    pub fn build(self) -> Result<CloudWatchTransport, Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Io)?;

        let client = runtime.block_on(async {
            let mut builder = aws_config::from_env().retry_config(self.retry_config.clone());
            if let Some(profile_name) = &self.profile_name {
                builder = builder.profile_name(profile_name);
            }

            if let Some(region) = &self.region {
                builder = builder.region(Region::new(region.clone()));
            }

            let config = builder.load().await;
            cloudwatchlogs::Client::new(&config)
        });

        let stream_name = self
            .stream_name
            .unwrap_or_else(|| format!("cwlog-{}", std::process::id()));

        Ok(CloudWatchTransport {
            client,
            runtime,
            stream_name,
        })
    }
}

impl Default for CloudWatchTransportBuilder {
    fn default() -> Self {
        CloudWatchTransportBuilder::new()
    }
}

impl Transport for CloudWatchTransport {
    fn ensure_destination(&self, name: &str) -> Result<DestinationHandle, Error> {
        self.runtime.block_on(async {
            match self
                .client
                .create_log_group()
                .log_group_name(name)
                .send()
                .await
            {
                Ok(_) => {}
                Err(err) => {
                    let err = err.into_service_error();
                    if !err.is_resource_already_exists_exception() {
                        return Err(Error::Destination(format!(
                            "failed creating log group {name}: {err}"
                        )));
                    }
                }
            }

            match self
                .client
                .create_log_stream()
                .log_group_name(name)
                .log_stream_name(&self.stream_name)
                .send()
                .await
            {
                Ok(_) => {}
                Err(err) => {
                    let err = err.into_service_error();
                    if !err.is_resource_already_exists_exception() {
                        return Err(Error::Destination(format!(
                            "failed creating log stream {}/{}: {err}",
                            name, self.stream_name
                        )));
                    }
                }
            }

            Ok(DestinationHandle::new(name, &self.stream_name))
        })
    }

    fn append(
        &self,
        handle: &DestinationHandle,
        events: &[LogEvent],
        token: Option<&str>,
    ) -> Result<Option<String>, Error> {
        let wire_events = events
            .iter()
            .map(wire_event)
            .collect::<Result<Vec<_>, Error>>()?;

        self.runtime.block_on(async {
            let mut builder = self
                .client
                .put_log_events()
                .log_group_name(&handle.group)
                .log_stream_name(&handle.stream)
                .set_log_events(Some(wire_events));

            if let Some(token) = token {
                builder = builder.sequence_token(token);
            }

            match builder.send().await {
                Ok(response) => Ok(response.next_sequence_token().map(str::to_string)),
                Err(err) => match err.into_service_error() {
                    PutLogEventsError::InvalidSequenceTokenException(stale) => {
                        Err(Error::StaleToken {
                            expected: stale.expected_sequence_token().map(str::to_string),
                        })
                    }
                    PutLogEventsError::DataAlreadyAcceptedException(accepted) => {
                        Err(Error::StaleToken {
                            expected: accepted.expected_sequence_token().map(str::to_string),
                        })
                    }
                    other => Err(Error::Transport(format!(
                        "put_log_events to {}/{} failed: {other}",
                        handle.group, handle.stream
                    ))),
                },
            }
        })
    }
}

fn wire_event(event: &LogEvent) -> Result<InputLogEvent, Error> {
    InputLogEvent::builder()
        .timestamp(event.timestamp)
        .message(wire_message(event))
        .build()
        .map_err(|err| Error::Transport(format!("invalid log event: {err}")))
}

/// One line per event. Structured payloads go out as compact JSON so the
/// backend can index their fields; a message is merged into map payloads
/// the same way the stream renderer does it.
fn wire_message(event: &LogEvent) -> String {
    match (&event.message, &event.structured) {
        (Some(message), Some(structured)) => match structured {
            Value::Object(map) if !map.contains_key("message") => {
                render::structured_line(structured, Some(message))
            }
            _ => format!("{message} {structured}"),
        },
        (None, Some(structured)) => structured.to_string(),
        (Some(message), None) => message.clone(),
        (None, None) => String::new(),
    }
}
