//! 256-bit private key as eight little-endian 32-bit words.
//!
//! Word 0 holds the least-significant 32 bits. A nibble position `p` in
//! `0..64` lives in word `p / 8` at bit shift `(p % 8) * 4`, so position 0 is
//! the lowest hex digit of the key and position 63 the highest.

use std::fmt;
use std::str::FromStr;

/// Number of 32-bit words in a key.
pub const KEY_WORDS: usize = 8;
/// Number of hex digits (nibbles) in a key.
pub const KEY_NIBBLES: usize = 64;

const BITS_PER_NIBBLE: u32 = 4;

/// Fixed-width 256-bit key, little-endian word order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Key {
    words: [u32; KEY_WORDS],
}

impl Key {
    pub const ZERO: Key = Key {
        words: [0; KEY_WORDS],
    };

    /// Build from little-endian words (word 0 least significant).
    pub const fn from_words(words: [u32; KEY_WORDS]) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[u32; KEY_WORDS] {
        &self.words
    }

    /// Word index and bit shift for a nibble position.
    #[inline]
    pub fn locate(position: u8) -> (usize, u32) {
        debug_assert!((position as usize) < KEY_NIBBLES);
        let word = position as usize / 8;
        let shift = (position as u32 % 8) * BITS_PER_NIBBLE;
        (word, shift)
    }

    /// Value of the nibble at `position`.
    pub fn nibble(&self, position: u8) -> u8 {
        let (word, shift) = Self::locate(position);
        ((self.words[word] >> shift) & 0xF) as u8
    }

    /// OR a 4-bit value into `position`.
    ///
    /// Does not clear the target bits first: callers rely on them being zero.
    #[inline]
    pub fn or_nibble(&mut self, position: u8, value: u8) {
        let (word, shift) = Self::locate(position);
        self.words[word] |= ((value & 0xF) as u32) << shift;
    }

    /// Big-endian byte encoding, the layout secp256k1 expects.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, word) in self.words.iter().rev().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        let mut words = [0u32; KEY_WORDS];
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            words[KEY_WORDS - 1 - i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self { words }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(self, f)
    }
}

impl fmt::LowerHex for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for word in self.words.iter().rev() {
            write!(f, "{:08x}", word)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:x})", self)
    }
}

/// Error parsing a fully specified hex key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("key must be exactly 64 hex characters, got {0}")]
    Length(usize),
    #[error("invalid hex character '{character}' at position {position}")]
    Character { character: char, position: usize },
}

impl FromStr for Key {
    type Err = KeyParseError;

    /// Parse 64 hex characters, most significant first. A `0x` prefix is allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);

        let len = s.chars().count();
        if len != KEY_NIBBLES {
            return Err(KeyParseError::Length(len));
        }

        let mut key = Key::ZERO;
        for (i, c) in s.chars().enumerate() {
            let value = c
                .to_digit(16)
                .ok_or(KeyParseError::Character { character: c, position: i })?;
            key.or_nibble((KEY_NIBBLES - 1 - i) as u8, value as u8);
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nibble_addressing() {
        let mut key = Key::ZERO;
        key.or_nibble(0, 0x5);
        key.or_nibble(63, 0x1);
        key.or_nibble(9, 0xa);

        assert_eq!(key.words()[0], 0x0000_0005);
        assert_eq!(key.words()[1], 0x0000_00a0);
        assert_eq!(key.words()[7], 0x1000_0000);
        assert_eq!(key.nibble(0), 5);
        assert_eq!(key.nibble(9), 0xa);
        assert_eq!(key.nibble(63), 1);
        assert_eq!(key.nibble(1), 0);
    }

    #[test]
    fn test_or_nibble_masks_value() {
        let mut key = Key::ZERO;
        key.or_nibble(2, 0xff);
        assert_eq!(key.words()[0], 0x0000_0f00);
    }

    #[test]
    fn test_be_bytes_layout() {
        let key = Key::from_words([1, 0, 0, 0, 0, 0, 0, 0x8000_0000]);
        let bytes = key.to_be_bytes();

        assert_eq!(bytes[0], 0x80);
        assert_eq!(bytes[31], 0x01);
        assert_eq!(Key::from_be_bytes(&bytes), key);
    }

    #[test]
    fn test_hex_display() {
        let key = Key::from_words([0xdeadbeef, 0, 0, 0, 0, 0, 0, 0x0100_0000]);
        let hex = key.to_string();

        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("01000000"));
        assert!(hex.ends_with("deadbeef"));
    }

    #[test]
    fn test_parse_hex() {
        let s = "c4bbcb1fbec99d65bf59d85c8cb62ee2db963f0fe106f483d9afa73bd4e39a8a";
        let key: Key = s.parse().unwrap();
        assert_eq!(key.to_string(), s);
        assert_eq!(key.words()[0], 0xd4e39a8a);

        let upper: Key = format!("0x{}", s.to_uppercase()).parse().unwrap();
        assert_eq!(upper, key);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!("abc".parse::<Key>(), Err(KeyParseError::Length(3)));

        let bad = format!("{}z", "0".repeat(63));
        assert_eq!(
            bad.parse::<Key>(),
            Err(KeyParseError::Character { character: 'z', position: 63 })
        );
    }
}
