//! Mask compiler - turn a hex/wildcard mask into a search context.
//!
//! A mask is 64 characters, one per nibble of a 256-bit key, leftmost
//! character most significant. Hex digits fix a nibble; `?` leaves it open
//! for enumeration.

use std::fmt;
use std::str::FromStr;

use crate::key::{Key, KEY_NIBBLES};

/// Wildcard character in a mask.
pub const WILDCARD: char = '?';

/// Errors produced while compiling a mask.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaskError {
    #[error("mask must be exactly {expected} characters long, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid character '{character}' in mask at position {position}; use 0-9, a-f or ?")]
    InvalidCharacter { character: char, position: usize },
}

/// Compiled mask: the known part of the key plus where the unknowns are.
///
/// Never mutated after [`MaskContext::compile`], so one instance can be shared
/// by reference across every worker of a search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskContext {
    fixed_key: Key,
    wildcard_positions: Vec<u8>,
}

impl MaskContext {
    /// Parse a 64-character mask.
    ///
    /// Character `i` addresses nibble position `63 - i`. Wildcard positions are
    /// recorded in scan order, so the list is in descending position order.
    pub fn compile(mask: &str) -> Result<Self, MaskError> {
        let actual = mask.chars().count();
        if actual != KEY_NIBBLES {
            return Err(MaskError::InvalidLength {
                expected: KEY_NIBBLES,
                actual,
            });
        }

        let mut fixed_key = Key::ZERO;
        let mut wildcard_positions = Vec::new();

        for (i, c) in mask.chars().enumerate() {
            let position = (KEY_NIBBLES - 1 - i) as u8;

            if c == WILDCARD {
                wildcard_positions.push(position);
                continue;
            }

            let value = c
                .to_digit(16)
                .ok_or(MaskError::InvalidCharacter { character: c, position: i })?;
            fixed_key.or_nibble(position, value as u8);
        }

        Ok(Self {
            fixed_key,
            wildcard_positions,
        })
    }

    /// Known nibbles; zero at every wildcard position.
    pub fn fixed_key(&self) -> &Key {
        &self.fixed_key
    }

    /// Wildcard nibble positions in mask scan order (most significant first).
    pub fn wildcard_positions(&self) -> &[u8] {
        &self.wildcard_positions
    }

    pub fn wildcard_count(&self) -> usize {
        self.wildcard_positions.len()
    }

    pub fn is_wildcard(&self, position: u8) -> bool {
        self.wildcard_positions.contains(&position)
    }

    /// Render the mask back to text (lowercase hex, `?` for wildcards).
    pub fn mask_string(&self) -> String {
        (0..KEY_NIBBLES)
            .rev()
            .map(|p| {
                let p = p as u8;
                if self.is_wildcard(p) {
                    WILDCARD
                } else {
                    char::from_digit(self.fixed_key.nibble(p) as u32, 16).unwrap_or('0')
                }
            })
            .collect()
    }
}

impl FromStr for MaskContext {
    type Err = MaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for MaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mask_string())
    }
}
