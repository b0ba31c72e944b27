use serde_json::Value;

use crate::error::Error;

/// Handle to a remote destination, returned by
/// [`Transport::ensure_destination`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationHandle {
    pub group: String,
    pub stream: String,
}

impl DestinationHandle {
    pub fn new(group: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            stream: stream.into(),
        }
    }
}

/// One record handed to the remote transport. The transport decides the
/// wire format; the sink only supplies the pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Epoch milliseconds, supplied by the sink at emission time.
    pub timestamp: i64,
    pub message: Option<String>,
    pub structured: Option<Value>,
}

/// Boundary to the remote log-ingestion service.
///
/// `append` must preserve the order of `events` and returns the
/// continuation token to supply on the next append. Failure modes:
/// [`Error::StaleToken`] when the supplied token is outdated (the caller
/// retries once with the expected token), [`Error::Transport`] and
/// [`Error::Destination`] for everything else (never retried here).
pub trait Transport: Send + Sync {
    fn ensure_destination(&self, name: &str) -> Result<DestinationHandle, Error>;

    fn append(
        &self,
        handle: &DestinationHandle,
        events: &[LogEvent],
        token: Option<&str>,
    ) -> Result<Option<String>, Error>;
}

/// Per-destination continuation-token state.
///
/// The remote API requires the exact current token and hands back a new one
/// on every append, so all transitions are read-modify-write and the owner
/// must hold a lock across [`RemoteStream::append`].
#[derive(Debug)]
pub(crate) enum RemoteStream {
    Uninitialized,
    Ready {
        handle: DestinationHandle,
        token: Option<String>,
    },
    /// Terminal until the sink is reconstructed. Entered when the
    /// destination cannot be created or a retried append fails.
    Failed(String),
}

impl RemoteStream {
    pub(crate) fn new() -> Self {
        RemoteStream::Uninitialized
    }

    pub(crate) fn append(
        &mut self,
        transport: &dyn Transport,
        destination: &str,
        events: &[LogEvent],
    ) -> Result<(), Error> {
        if let RemoteStream::Failed(reason) = self {
            return Err(Error::Destination(format!(
                "destination previously failed: {reason}"
            )));
        }

        if let RemoteStream::Uninitialized = self {
            match transport.ensure_destination(destination) {
                Ok(handle) => *self = RemoteStream::Ready { handle, token: None },
                Err(err) => {
                    *self = RemoteStream::Failed(err.to_string());
                    return Err(err);
                }
            }
        }

        let (handle, token) = match self {
            RemoteStream::Ready { handle, token } => (handle.clone(), token.clone()),
            _ => return Err(Error::Destination("remote stream is not ready".to_string())),
        };

        match transport.append(&handle, events, token.as_deref()) {
            Ok(next) => {
                *self = RemoteStream::Ready {
                    handle,
                    token: next,
                };
                Ok(())
            }
            Err(Error::StaleToken { expected }) => {
                // Exactly one retry, with the token the service reports.
                match transport.append(&handle, events, expected.as_deref()) {
                    Ok(next) => {
                        *self = RemoteStream::Ready {
                            handle,
                            token: next,
                        };
                        Ok(())
                    }
                    Err(retry_err) => {
                        let reason = retry_err.to_string();
                        *self = RemoteStream::Failed(reason.clone());
                        Err(Error::Transport(format!(
                            "append failed after stale-token retry: {reason}"
                        )))
                    }
                }
            }
            // A plain transport failure is surfaced as-is; the stream keeps
            // its token and stays usable.
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeTransport {
        appends: Mutex<Vec<(Option<String>, usize)>>,
        ensures: Mutex<u32>,
        ensure_result: fn() -> Result<DestinationHandle, Error>,
        // One scripted outcome per append call, consumed front to back.
        script: Mutex<Vec<Result<Option<String>, Error>>>,
    }

    impl FakeTransport {
        fn new(script: Vec<Result<Option<String>, Error>>) -> Self {
            Self {
                appends: Mutex::new(Vec::new()),
                ensures: Mutex::new(0),
                ensure_result: || Ok(DestinationHandle::new("app-logs", "main")),
                script: Mutex::new(script),
            }
        }

        fn failing_to_ensure() -> Self {
            let mut transport = Self::new(vec![]);
            transport.ensure_result = || Err(Error::Destination("access denied".to_string()));
            transport
        }

        fn append_calls(&self) -> Vec<(Option<String>, usize)> {
            self.appends.lock().unwrap().clone()
        }

        fn ensure_calls(&self) -> u32 {
            *self.ensures.lock().unwrap()
        }
    }

    impl Transport for FakeTransport {
        fn ensure_destination(&self, _name: &str) -> Result<DestinationHandle, Error> {
            *self.ensures.lock().unwrap() += 1;
            (self.ensure_result)()
        }

        fn append(
            &self,
            _handle: &DestinationHandle,
            events: &[LogEvent],
            token: Option<&str>,
        ) -> Result<Option<String>, Error> {
            self.appends
                .lock()
                .unwrap()
                .push((token.map(str::to_string), events.len()));
            self.script.lock().unwrap().remove(0)
        }
    }

    fn event() -> LogEvent {
        LogEvent {
            timestamp: 1_700_000_000_000,
            message: Some("msg".to_string()),
            structured: None,
        }
    }

    #[test]
    fn sequential_appends_thread_the_continuation_token() {
        let transport = FakeTransport::new(vec![
            Ok(Some("t1".to_string())),
            Ok(Some("t2".to_string())),
        ]);
        let mut stream = RemoteStream::new();

        stream.append(&transport, "app-logs", &[event()]).unwrap();
        stream.append(&transport, "app-logs", &[event()]).unwrap();

        assert_eq!(transport.ensure_calls(), 1);
        assert_eq!(
            transport.append_calls(),
            vec![(None, 1), (Some("t1".to_string()), 1)]
        );
    }

    #[test]
    fn stale_token_is_retried_exactly_once_with_the_expected_token() {
        let transport = FakeTransport::new(vec![
            Err(Error::StaleToken {
                expected: Some("t9".to_string()),
            }),
            Ok(Some("t10".to_string())),
        ]);
        let mut stream = RemoteStream::new();

        stream.append(&transport, "app-logs", &[event()]).unwrap();

        assert_eq!(
            transport.append_calls(),
            vec![(None, 1), (Some("t9".to_string()), 1)]
        );

        // The refreshed token from the retry is used afterwards.
        transport
            .script
            .lock()
            .unwrap()
            .push(Ok(Some("t11".to_string())));
        stream.append(&transport, "app-logs", &[event()]).unwrap();
        assert_eq!(
            transport.append_calls().last().unwrap().0,
            Some("t10".to_string())
        );
    }

    #[test]
    fn failed_retry_escalates_and_poisons_the_stream() {
        let transport = FakeTransport::new(vec![
            Err(Error::StaleToken {
                expected: Some("t9".to_string()),
            }),
            Err(Error::Transport("service unavailable".to_string())),
        ]);
        let mut stream = RemoteStream::new();

        let err = stream.append(&transport, "app-logs", &[event()]).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        // Subsequent appends fail fast without touching the transport.
        let err = stream.append(&transport, "app-logs", &[event()]).unwrap_err();
        assert!(matches!(err, Error::Destination(_)));
        assert_eq!(transport.append_calls().len(), 2);
    }

    #[test]
    fn plain_transport_error_is_not_retried_and_keeps_the_stream_usable() {
        let transport = FakeTransport::new(vec![
            Err(Error::Transport("timeout".to_string())),
            Ok(Some("t1".to_string())),
        ]);
        let mut stream = RemoteStream::new();

        let err = stream.append(&transport, "app-logs", &[event()]).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        stream.append(&transport, "app-logs", &[event()]).unwrap();
        assert_eq!(transport.append_calls().len(), 2);
    }

    #[test]
    fn ensure_failure_poisons_the_stream() {
        let transport = FakeTransport::failing_to_ensure();
        let mut stream = RemoteStream::new();

        let err = stream.append(&transport, "app-logs", &[event()]).unwrap_err();
        assert!(matches!(err, Error::Destination(_)));

        let err = stream.append(&transport, "app-logs", &[event()]).unwrap_err();
        assert!(matches!(err, Error::Destination(_)));
        assert_eq!(transport.ensure_calls(), 1);
        assert_eq!(transport.append_calls().len(), 0);
    }
}
