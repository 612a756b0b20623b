use serde::{Deserialize, Serialize};
use std::fmt;

/// Letters spoken by the auditory channel, in alphabet order.
pub const LETTERS: [char; 8] = ['c', 'h', 'k', 'l', 'q', 'r', 's', 't'];

/// Cell in the middle of the 3×3 grid. Variable-N sessions use it to show the active lag.
pub const CENTER_CELL: Cell = Cell(4);

/// A value drawn from a small, fixed stimulus alphabet.
///
/// Both channels of the trainer are finite alphabets, so the generator can
/// build candidate sets generically by enumerating indices.
pub trait Stimulus: Copy + Clone + PartialEq + Eq + Send + Sync + fmt::Debug {
    const COUNT: usize;

    fn index(&self) -> usize;
    fn from_index(index: usize) -> Option<Self>;

    fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).filter_map(Self::from_index)
    }
}

/// One of the nine grid cells, numbered row-major from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Cell(u8);

impl Cell {
    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < Self::COUNT).then_some(Self(index))
    }

    pub fn is_center(&self) -> bool {
        *self == CENTER_CELL
    }
}

impl Stimulus for Cell {
    const COUNT: usize = 9;

    fn index(&self) -> usize {
        usize::from(self.0)
    }

    fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().and_then(Self::new)
    }
}

impl TryFrom<u8> for Cell {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("grid cell {value} out of range 0..=8"))
    }
}

impl From<Cell> for u8 {
    fn from(cell: Cell) -> Self {
        cell.0
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the eight spoken letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Letter(u8);

impl Letter {
    pub fn as_char(&self) -> char {
        LETTERS[usize::from(self.0)]
    }
}

impl Stimulus for Letter {
    const COUNT: usize = LETTERS.len();

    fn index(&self) -> usize {
        usize::from(self.0)
    }

    fn from_index(index: usize) -> Option<Self> {
        (index < Self::COUNT).then(|| Self(index as u8))
    }
}

impl TryFrom<char> for Letter {
    type Error = String;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        LETTERS
            .iter()
            .position(|c| *c == value.to_ascii_lowercase())
            .map(|i| Self(i as u8))
            .ok_or_else(|| format!("'{value}' is not one of the trainer letters"))
    }
}

impl From<Letter> for char {
    fn from(letter: Letter) -> Self {
        letter.as_char()
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Receives each trial's letter for audio playback.
///
/// Fire-and-forget: a sink that cannot play (no device, decode failure)
/// should swallow the error so the session continues visually.
pub trait PlaybackSink {
    fn play(&mut self, letter: Letter);
}

/// Playback sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayback;

impl PlaybackSink for SilentPlayback {
    fn play(&mut self, _letter: Letter) {}
}
