use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// The two channels a player answers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Position,
    Audio,
}

impl Modality {
    pub const ALL: [Modality; 2] = [Modality::Position, Modality::Audio];
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Position => f.write_str("position"),
            Modality::Audio => f.write_str("audio"),
        }
    }
}

/// A value held once per modality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerModality<T> {
    pub position: T,
    pub audio: T,
}

impl<T> PerModality<T> {
    pub fn new(position: T, audio: T) -> Self {
        Self { position, audio }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Modality, &T)> {
        [(Modality::Position, &self.position), (Modality::Audio, &self.audio)].into_iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerModality<U> {
        PerModality {
            position: f(&self.position),
            audio: f(&self.audio),
        }
    }
}

impl<T> Index<Modality> for PerModality<T> {
    type Output = T;

    fn index(&self, modality: Modality) -> &T {
        match modality {
            Modality::Position => &self.position,
            Modality::Audio => &self.audio,
        }
    }
}

impl<T> IndexMut<Modality> for PerModality<T> {
    fn index_mut(&mut self, modality: Modality) -> &mut T {
        match modality {
            Modality::Position => &mut self.position,
            Modality::Audio => &mut self.audio,
        }
    }
}
