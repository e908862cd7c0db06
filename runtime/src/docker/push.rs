//! Registry push driver.

use std::time::Duration;

use opsdeck_core::error::{OpsError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::auth::CredentialProvider;
use super::daemon::DaemonClient;
use super::events::{ProgressSink, PushConsumer, PushEvent, PushState};
use super::reference::ImageReference;

/// Default overall deadline for one push.
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(300);

/// Result of a completed push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSummary {
    /// Image reference as given by the caller
    pub image: String,
    /// Accumulated progress units (approximate, may exceed the nominal total)
    pub progress: u64,
    /// Events applied from the stream
    pub events: usize,
}

/// Pushes images through the daemon and reports progress to a sink.
pub struct RegistryPushDriver<C> {
    daemon: DaemonClient,
    credentials: C,
    timeout: Duration,
}

impl<C: CredentialProvider> RegistryPushDriver<C> {
    pub fn new(daemon: DaemonClient, credentials: C) -> Self {
        Self {
            daemon,
            credentials,
            timeout: DEFAULT_PUSH_TIMEOUT,
        }
    }

    /// Bound the whole push (connect, request and stream) by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Push `image`, forwarding status and progress to `sink`.
    ///
    /// Credentials are fetched from the provider for this call only. The
    /// first error event in the stream fails the push with `PushError`.
    pub async fn push(&self, image: &str, sink: &mut dyn ProgressSink) -> Result<PushSummary> {
        let reference = ImageReference::parse(image)?;
        let (name, tag) = reference.push_target()?;
        let token = self.credentials.credentials()?.encode()?;

        tracing::info!(image, name = %name, tag = ?tag, endpoint = %self.daemon.endpoint(), "Pushing image");

        let push = async {
            let stream = self.daemon.push(&name, tag.as_deref(), &token).await?;
            consume_push_stream(stream, sink).await
        };

        let (progress, events) = tokio::time::timeout(self.timeout, push)
            .await
            .map_err(|_| {
                OpsError::Timeout(format!(
                    "push of {} did not finish within {:?}",
                    image, self.timeout
                ))
            })??;

        tracing::info!(image, progress, events, "Image pushed");
        Ok(PushSummary {
            image: image.to_string(),
            progress,
            events,
        })
    }
}

/// Decode newline-delimited push events from `reader` until the stream ends,
/// an event fails to decode, or an error event arrives.
///
/// Returns the accumulated progress and the number of events applied. The
/// reader is consumed and dropped on every path, closing the connection.
pub async fn consume_push_stream<R>(mut reader: R, sink: &mut dyn ProgressSink) -> Result<(u64, usize)>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumer = PushConsumer::new();
    let mut line = Vec::new();

    while consumer.is_reading() {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            consumer.finish();
            break;
        }

        let trimmed = trim_whitespace(&line);
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_slice::<PushEvent>(trimmed) {
            Ok(event) => {
                consumer.apply(&event, sink);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Undecodable push event, treating as end of stream");
                consumer.finish();
            }
        }
    }

    match consumer.state() {
        PushState::Aborted(error) => Err(OpsError::PushError(error.clone())),
        _ => Ok((consumer.progress(), consumer.processed())),
    }
}

fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::events::NoProgress;

    #[derive(Default)]
    struct Advances(Vec<u64>);

    impl ProgressSink for Advances {
        fn advance(&mut self, units: u64) {
            self.0.push(units);
        }
    }

    #[tokio::test]
    async fn test_stream_completes() {
        let stream: &[u8] =
            b"{\"status\":\"Layer already exists\"}\r\n{\"status\":\"Pushed\"}\r\n";
        let mut sink = Advances::default();

        let (progress, events) = consume_push_stream(stream, &mut sink).await.unwrap();
        assert_eq!(sink.0, vec![10, 15]);
        assert_eq!(progress, 25);
        assert_eq!(events, 2);
    }

    #[tokio::test]
    async fn test_stream_error_event() {
        let stream: &[u8] = b"{\"error\":\"unauthorized\"}\n";
        let mut sink = Advances::default();

        match consume_push_stream(stream, &mut sink).await {
            Err(OpsError::PushError(message)) => assert_eq!(message, "unauthorized"),
            other => panic!("Expected PushError, got {:?}", other),
        }
        assert!(sink.0.is_empty());
    }

    #[tokio::test]
    async fn test_stream_stops_at_error() {
        let stream: &[u8] = b"{\"status\":\"Pushed\"}\n{\"error\":\"denied\"}\n{\"status\":\"Pushed\"}\n";
        let mut sink = Advances::default();

        let result = consume_push_stream(stream, &mut sink).await;
        assert!(matches!(result, Err(OpsError::PushError(_))));
        assert_eq!(sink.0, vec![15]);
    }

    #[tokio::test]
    async fn test_undecodable_event_ends_stream() {
        let stream: &[u8] = b"{\"status\":\"Pushed\"}\nnot-json\n{\"error\":\"never seen\"}\n";

        let (progress, events) = consume_push_stream(stream, &mut NoProgress).await.unwrap();
        assert_eq!(progress, 15);
        assert_eq!(events, 1);
    }

    #[tokio::test]
    async fn test_empty_stream_completes() {
        let stream: &[u8] = b"";
        let (progress, events) = consume_push_stream(stream, &mut NoProgress).await.unwrap();
        assert_eq!((progress, events), (0, 0));
    }

    #[tokio::test]
    async fn test_blank_lines_skipped() {
        let stream: &[u8] = b"\n\r\n{\"status\":\"Pushed\"}\n\n";
        let (progress, events) = consume_push_stream(stream, &mut NoProgress).await.unwrap();
        assert_eq!((progress, events), (15, 1));
    }
}
