//! Push stream events and the consumer state machine.
//!
//! The daemon answers a push with newline-delimited JSON objects, each
//! carrying any subset of `status`, `progress` and `error`. The consumer
//! turns them into display updates and an approximate progress count:
//! status strings say nothing about bytes, so a layer that already exists
//! counts [`LAYER_EXISTS_UNITS`] and a pushed layer [`LAYER_PUSHED_UNITS`]
//! toward a nominal [`PROGRESS_TOTAL`]. Many-layer images can run past it.

use serde::{Deserialize, Deserializer};

/// Status substring for a layer the registry already holds.
pub const LAYER_EXISTS: &str = "Layer already exists";

/// Status substring for a layer that finished uploading.
pub const LAYER_PUSHED: &str = "Pushed";

pub const LAYER_EXISTS_UNITS: u64 = 10;
pub const LAYER_PUSHED_UNITS: u64 = 15;

/// Nominal length of the progress indicator.
pub const PROGRESS_TOTAL: u64 = 100;

/// One decoded object from the push stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushEvent {
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(default, deserialize_with = "nullable")]
    pub progress: String,
    #[serde(default, deserialize_with = "nullable")]
    pub error: String,
    #[serde(default, rename = "errorDetail")]
    pub error_detail: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
}

fn nullable<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl PushEvent {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Default::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Default::default()
        }
    }

    /// Failure text carried by this event, if any.
    pub fn error_text(&self) -> Option<&str> {
        if !self.error.is_empty() {
            return Some(&self.error);
        }
        self.error_detail
            .as_ref()
            .map(|d| d.message.as_str())
            .filter(|m| !m.is_empty())
    }
}

/// Receives display updates while a push stream is consumed.
pub trait ProgressSink {
    /// Latest phase description.
    fn status(&mut self, _status: &str) {}

    /// Progress counter moved forward by `units`.
    fn advance(&mut self, _units: u64) {}

    /// Combined status and human-readable transfer progress.
    fn detail(&mut self, _status: &str, _progress: &str) {}
}

/// Sink that discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Consumer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushState {
    Reading,
    Aborted(String),
    Completed,
}

/// Applies push events in order until an error event or the end of the stream.
#[derive(Debug)]
pub struct PushConsumer {
    state: PushState,
    progress: u64,
    processed: usize,
    last_status: String,
}

impl Default for PushConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl PushConsumer {
    pub fn new() -> Self {
        Self {
            state: PushState::Reading,
            progress: 0,
            processed: 0,
            last_status: String::new(),
        }
    }

    pub fn state(&self) -> &PushState {
        &self.state
    }

    pub fn is_reading(&self) -> bool {
        self.state == PushState::Reading
    }

    /// Accumulated progress units. Never decreases.
    pub fn progress(&self) -> u64 {
        self.progress
    }

    /// Number of events applied without error.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Apply one event. Events arriving after the consumer left `Reading` are ignored.
    pub fn apply(&mut self, event: &PushEvent, sink: &mut dyn ProgressSink) -> &PushState {
        if !self.is_reading() {
            return &self.state;
        }

        if let Some(error) = event.error_text() {
            tracing::debug!(error, "Push stream reported an error");
            self.state = PushState::Aborted(error.to_string());
            return &self.state;
        }

        if !event.status.is_empty() {
            let units = if event.status.contains(LAYER_EXISTS) {
                LAYER_EXISTS_UNITS
            } else if event.status.contains(LAYER_PUSHED) {
                LAYER_PUSHED_UNITS
            } else {
                0
            };
            if units > 0 {
                self.progress += units;
                sink.advance(units);
            }
            sink.status(&event.status);
            self.last_status = event.status.clone();
        }

        if !event.progress.is_empty() {
            sink.detail(&self.last_status, &event.progress);
        }

        self.processed += 1;
        &self.state
    }

    /// Mark the end of the stream. Has no effect once aborted.
    pub fn finish(&mut self) -> &PushState {
        if self.is_reading() {
            self.state = PushState::Completed;
        }
        &self.state
    }
}
