//! The pecking mini-game: a random key sequence cleared one press at a time.

use std::ops::RangeInclusive;

use input::KeyCode;
use rand::Rng;

/// Keys used by the mini-game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeckKey {
    W,
    A,
    S,
    D,
}

impl PeckKey {
    pub const ALL: [PeckKey; 4] = [PeckKey::W, PeckKey::A, PeckKey::S, PeckKey::D];

    pub fn key_code(self) -> KeyCode {
        match self {
            PeckKey::W => KeyCode::KeyW,
            PeckKey::A => KeyCode::KeyA,
            PeckKey::S => KeyCode::KeyS,
            PeckKey::D => KeyCode::KeyD,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            PeckKey::W => 'W',
            PeckKey::A => 'A',
            PeckKey::S => 'S',
            PeckKey::D => 'D',
        }
    }
}

/// Result of one frame's presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeckOutcome {
    /// The current key was matched; `remaining` keys are left.
    Hit { remaining: usize },
    /// Wrong key, or more than one key at once.
    Miss,
}

/// Keys still to press. The next key is the last element.
#[derive(Debug, Clone, Default)]
pub struct PeckSequence {
    keys: Vec<PeckKey>,
}

impl PeckSequence {
    /// Random sequence with a length drawn from `length`, never repeating a
    /// key twice in a row.
    pub fn generate<R: Rng>(rng: &mut R, length: RangeInclusive<usize>) -> Self {
        let n = if length.is_empty() { 0 } else { rng.gen_range(length) };
        let mut keys: Vec<PeckKey> = Vec::with_capacity(n);
        for _ in 0..n {
            let choices: Vec<PeckKey> = PeckKey::ALL
                .into_iter()
                .filter(|k| keys.last() != Some(k))
                .collect();
            keys.push(choices[rng.gen_range(0..choices.len())]);
        }
        Self { keys }
    }

    #[cfg(test)]
    pub fn from_keys(keys: Vec<PeckKey>) -> Self {
        Self { keys }
    }

    pub fn current(&self) -> Option<PeckKey> {
        self.keys.last().copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Up to `n` upcoming keys, next one first.
    pub fn preview(&self, n: usize) -> Vec<PeckKey> {
        self.keys.iter().rev().take(n).copied().collect()
    }

    /// Judge the peck keys pressed this frame. `None` if nothing was pressed.
    pub fn respond(&mut self, pressed: &[PeckKey]) -> Option<PeckOutcome> {
        let current = self.current()?;
        match pressed {
            [] => None,
            [only] if *only == current => {
                self.keys.pop();
                Some(PeckOutcome::Hit {
                    remaining: self.keys.len(),
                })
            }
            _ => Some(PeckOutcome::Miss),
        }
    }
}
