// Payload types for the commit/fetch channel.
//
// Two shapes travel over the wire:
// - `Deployment`: what a live-coding session commits. A set of `SoundLine`s
//   (one per instrument) plus the cycle length the playback client loops on.
// - `FetchResponse`: what a poller gets back. Either the pending
//   `Deployment` or an empty JSON object `{}` when nothing has been committed
//   since the last fetch.
//
// Field names follow the browser client's camelCase convention
// (`cycleLength`), so the structs carry `rename_all = "camelCase"`.

use serde::{Deserialize, Serialize};

/// Instrument name used when a line does not specify one.
pub const DEFAULT_INSTRUMENT: &str = "sine";

/// Cycle length (in beats) used when a session does not specify one.
pub const DEFAULT_CYCLE_LENGTH: f64 = 2.0;

/// One instrument line: MIDI note numbers and a parallel rhythm pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundLine {
    /// Instrument (synthesis kernel) name on the playback side.
    pub name: String,
    /// MIDI note numbers.
    pub notes: Vec<i32>,
    /// Relative durations, cycled against `notes` by the client.
    pub rhythm: Vec<i32>,
}

impl SoundLine {
    pub fn new(name: impl Into<String>, notes: Vec<i32>, rhythm: Vec<i32>) -> Self {
        Self {
            name: name.into(),
            notes,
            rhythm,
        }
    }
}

/// A committed batch of lines, replacing whatever the client was playing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Whether the client should start playing this batch.
    pub deploy: bool,
    /// Loop length in beats.
    pub cycle_length: f64,
    pub sound: Vec<SoundLine>,
}

impl Deployment {
    pub fn new(cycle_length: f64, sound: Vec<SoundLine>) -> Self {
        Self {
            deploy: true,
            cycle_length,
            sound,
        }
    }
}

/// Body of a fetch. `Empty` serializes to `{}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FetchResponse {
    Pending(Deployment),
    Empty {},
}

impl FetchResponse {
    pub fn is_empty(&self) -> bool {
        matches!(self, FetchResponse::Empty {})
    }

    /// The pending deployment, if any.
    pub fn into_deployment(self) -> Option<Deployment> {
        match self {
            FetchResponse::Pending(deployment) => Some(deployment),
            FetchResponse::Empty {} => None,
        }
    }
}

impl From<Option<Deployment>> for FetchResponse {
    fn from(pending: Option<Deployment>) -> Self {
        match pending {
            Some(deployment) => FetchResponse::Pending(deployment),
            None => FetchResponse::Empty {},
        }
    }
}
