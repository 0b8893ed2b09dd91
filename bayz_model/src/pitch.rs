// Pitch conversion for decoded tokens.
//
// Sub-symbols are note names in music21 spelling: a letter A-G, any number
// of accidentals (`#` sharp, `-` flat), then an optional octave number. The
// octave belongs to the letter, so `B#4` is 72 (C5) and `C-4` is 59 (B3).
// MIDI number = 12 * (octave + 1) + semitone, putting C4 at 60.
//
// The marker words REST, START and END produce no pitch.

use serde::{Deserialize, Serialize};

pub const REST: &str = "REST";
pub const START: &str = "START";
pub const END: &str = "END";

/// Octave used for note names that carry none.
pub const DEFAULT_OCTAVE: i32 = 4;

/// Which notes of a multi-note token to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchSelection {
    /// Every note, in token order (arpeggiated chord).
    #[default]
    All,
    /// Only the last note of each token (melody line).
    Last,
}

/// True for REST, START and END.
pub fn is_marker(symbol: &str) -> bool {
    matches!(symbol, REST | START | END)
}

fn letter_semitone(letter: char) -> Option<i32> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Split a note name into (semitone offset from C, octave if written).
/// The offset is not wrapped: `C-` gives -1 and `B#` gives 12.
fn parse_note(symbol: &str) -> Option<(i32, Option<i32>)> {
    let mut chars = symbol.chars();
    let mut semitone = letter_semitone(chars.next()?)?;
    let rest = chars.as_str();
    let accidentals = rest.len() - rest.trim_start_matches(['#', '-']).len();
    for accidental in rest[..accidentals].chars() {
        semitone += if accidental == '#' { 1 } else { -1 };
    }
    let octave = &rest[accidentals..];
    if octave.is_empty() {
        return Some((semitone, None));
    }
    octave.parse().ok().map(|o| (semitone, Some(o)))
}

/// Pitch class 0..12 of a note name, or `None` if it is not one.
pub fn pitch_class(symbol: &str) -> Option<i32> {
    parse_note(symbol).map(|(semitone, _)| semitone.rem_euclid(12))
}

/// MIDI number of a note name. `default_octave` applies when the name has
/// no octave of its own.
pub fn midi_pitch(symbol: &str, default_octave: i32) -> Option<i32> {
    let (semitone, octave) = parse_note(symbol)?;
    Some(12 * (octave.unwrap_or(default_octave) + 1) + semitone)
}

/// Pitches of one token. Marker tokens and unparseable symbols give none.
pub fn token_pitches<S: AsRef<str>>(
    token: &[S],
    default_octave: i32,
    selection: PitchSelection,
) -> Vec<i32> {
    match token.first() {
        None => return Vec::new(),
        Some(first) if is_marker(first.as_ref()) => return Vec::new(),
        Some(_) => {}
    }
    let symbols = match selection {
        PitchSelection::All => token,
        PitchSelection::Last => &token[token.len() - 1..],
    };
    symbols
        .iter()
        .filter_map(|s| midi_pitch(s.as_ref(), default_octave))
        .collect()
}

/// Pitches of a whole sequence, concatenated.
pub fn sequence_pitches<T: AsRef<[String]>>(
    tokens: &[T],
    default_octave: i32,
    selection: PitchSelection,
) -> Vec<i32> {
    tokens
        .iter()
        .flat_map(|token| token_pitches(token.as_ref(), default_octave, selection))
        .collect()
}
