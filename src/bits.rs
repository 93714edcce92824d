//! Low-level word and mask arithmetic shared by fields and the sync engine.
//!
//! Values are little-endian within a word: bit 0 is the LSB.

/// Mask covering the low `width` bits. `width` may be up to 64.
pub fn mask(width: u8) -> u64 {
    debug_assert!(width <= 64);
    if width == 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Whether `value` fits into `width` bits.
pub fn fits(value: u64, width: u8) -> bool {
    value <= mask(width)
}

/// Mask covering a `width`-bit range starting at `offset` (0 = LSB).
pub fn field_mask(offset: u8, width: u8) -> u64 {
    mask(width) << offset
}
