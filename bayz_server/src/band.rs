// A live-coding "band": instrument lines staged for the next commit.
//
// Lines accumulate until `commit`, which sends them as one `Deployment`
// (with `deploy: true`) to whatever `CommitSink` is attached, normally the
// running server. Committing does not clear the band, so a session can add
// a line and recommit everything.

use bayz_model::CachedSequence;
use bayz_model::pitch::{DEFAULT_OCTAVE, PitchSelection, sequence_pitches};
use bayz_protocol::{DEFAULT_CYCLE_LENGTH, DEFAULT_INSTRUMENT, Deployment, SoundLine};
use serde::{Deserialize, Serialize};

use crate::server::ServerHandle;

/// Where committed deployments go.
pub trait CommitSink {
    fn commit(&self, deployment: Deployment);
}

impl CommitSink for ServerHandle {
    fn commit(&self, deployment: Deployment) {
        ServerHandle::commit(self, deployment);
    }
}

/// How a generated sequence becomes a line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineOptions {
    pub instrument: String,
    pub rhythm: Vec<i32>,
    /// Octave for note names written without one.
    pub octave: i32,
    pub selection: PitchSelection,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            instrument: DEFAULT_INSTRUMENT.into(),
            rhythm: vec![1],
            octave: DEFAULT_OCTAVE,
            selection: PitchSelection::All,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Band {
    pub cycle_length: f64,
    lines: Vec<SoundLine>,
}

impl Default for Band {
    fn default() -> Self {
        Self::new(DEFAULT_CYCLE_LENGTH)
    }
}

impl Band {
    pub fn new(cycle_length: f64) -> Self {
        Self {
            cycle_length,
            lines: Vec::new(),
        }
    }

    pub fn add_line(&mut self, line: SoundLine) {
        self.lines.push(line);
    }

    /// Add notes with the default rhythm `[1]` on the default instrument.
    pub fn add_notes(&mut self, notes: Vec<i32>) {
        self.add_line(SoundLine::new(DEFAULT_INSTRUMENT, notes, vec![1]));
    }

    /// Convert a generated sequence to pitches and add it as a line.
    /// Returns the new line's note count; a sequence with no pitched
    /// tokens adds nothing and returns 0.
    pub fn add_sequence_line(&mut self, sequence: &CachedSequence, options: &LineOptions) -> usize {
        let notes = sequence_pitches(sequence, options.octave, options.selection);
        let count = notes.len();
        if count > 0 {
            self.add_line(SoundLine::new(
                options.instrument.clone(),
                notes,
                options.rhythm.clone(),
            ));
        }
        count
    }

    pub fn lines(&self) -> &[SoundLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn to_deployment(&self) -> Deployment {
        Deployment::new(self.cycle_length, self.lines.clone())
    }

    pub fn commit<C: CommitSink + ?Sized>(&self, sink: &C) {
        sink.commit(self.to_deployment());
    }
}
