//! Key reconstruction - map an iteration index onto the wildcard nibbles.

use crate::key::Key;
use crate::mask::MaskContext;

const BITS_PER_NIBBLE: u32 = 4;
const COUNTER_DIGITS: usize = (u64::BITS / BITS_PER_NIBBLE) as usize;

/// Build the candidate key for `index`.
///
/// Base-16 digit `j` of `index` (least significant first) lands in
/// `wildcard_positions[j]`. Positions are in mask scan order, so the lowest
/// digit drives the leftmost wildcard and enumeration is not numerically
/// ascending over keys unless the mask has a single wildcard.
///
/// Relies on every wildcard nibble being zero in the fixed key: the digit is
/// OR'd in without clearing.
#[inline]
pub fn reconstruct(ctx: &MaskContext, index: u64) -> Key {
    let mut key = *ctx.fixed_key();
    let mut counter = index;

    for &position in ctx.wildcard_positions() {
        if counter == 0 {
            break;
        }
        key.or_nibble(position, (counter & 0xF) as u8);
        counter >>= BITS_PER_NIBBLE;
    }

    key
}

impl MaskContext {
    /// Candidate key at `index`. See [`reconstruct`].
    pub fn key_at(&self, index: u64) -> Key {
        reconstruct(self, index)
    }

    /// Inverse of [`reconstruct`].
    ///
    /// `None` when the key disagrees with a fixed nibble, or when it can't be
    /// produced by the 64-bit counter (a nonzero digit past the 16th wildcard,
    /// or the all-`f` key that a saturated 16-wildcard domain skips).
    pub fn index_of(&self, key: &Key) -> Option<u64> {
        let fixed = self.fixed_key();
        for p in 0..crate::key::KEY_NIBBLES as u8 {
            if !self.is_wildcard(p) && key.nibble(p) != fixed.nibble(p) {
                return None;
            }
        }

        let mut index = 0u64;
        for (j, &position) in self.wildcard_positions().iter().enumerate() {
            let digit = key.nibble(position) as u64;
            if j >= COUNTER_DIGITS {
                if digit != 0 {
                    return None;
                }
                continue;
            }
            index |= digit << (j as u32 * BITS_PER_NIBBLE);
        }

        if self.wildcard_count() >= COUNTER_DIGITS && index == u64::MAX {
            return None;
        }
        Some(index)
    }
}
