//! Sequence storage and the pseudo-random source that grows it

use heapless::Vec;

use super::GameError;
use crate::BUTTON_COUNT;

/// Maximum sequence length; reaching it clears the game.
pub const SEQUENCE_CAPACITY: usize = 32;

/// Xorshift32 generator, reseeded from the clock on every new game.
#[derive(Debug, Clone)]
pub struct Xorshift32(u32);

impl Xorshift32 {
    /// Zero is a fixed point of xorshift, so it is replaced.
    pub const fn new(seed: u32) -> Self {
        Self(if seed == 0 { 0x9E37_79B9 } else { seed })
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    /// Uniform button index in `0..BUTTON_COUNT`.
    pub fn next_button(&mut self) -> u8 {
        // BUTTON_COUNT is a power of two, so the modulo is unbiased.
        (self.next_u32() % BUTTON_COUNT as u32) as u8
    }
}

/// Append-only list of button indices the player must reproduce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    steps: Vec<u8, SEQUENCE_CAPACITY>,
}

impl Sequence {
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Build a sequence from explicit steps, validating range and length.
    pub fn from_steps(steps: &[u8]) -> Result<Self, GameError> {
        let mut sequence = Self::new();
        for &step in steps {
            sequence.push(step)?;
        }
        Ok(sequence)
    }

    pub fn push(&mut self, step: u8) -> Result<(), GameError> {
        if usize::from(step) >= BUTTON_COUNT {
            return Err(GameError::InvalidStep(step));
        }
        self.steps.push(step).map_err(|_| GameError::SequenceFull)
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.steps.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.steps.len() >= SEQUENCE_CAPACITY
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.steps
    }
}
