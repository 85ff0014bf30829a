//! PACE flag register bits.

/// Bits 0 and 15 are hard-wired to logic 1.
pub const FR_FIXED: u16 = 0x8001;

/// Interrupt enable for level 1 (stack full/empty).
pub const IE1: u16 = 1 << 1;
/// Interrupt enable for level 2.
pub const IE2: u16 = 1 << 2;
/// Interrupt enable for level 3.
pub const IE3: u16 = 1 << 3;
/// Interrupt enable for level 4.
pub const IE4: u16 = 1 << 4;
/// Interrupt enable for level 5.
pub const IE5: u16 = 1 << 5;

/// Overflow.
pub const OVF: u16 = 1 << 6;
/// Carry.
pub const CRY: u16 = 1 << 7;
/// Link.
pub const LINK: u16 = 1 << 8;
/// Interrupt master enable. Cleared on interrupt entry.
pub const IEN: u16 = 1 << 9;
/// Byte mode.
pub const BYTE: u16 = 1 << 10;

/// General flags driving the F11..F14 output pins.
pub const F11: u16 = 1 << 11;
pub const F12: u16 = 1 << 12;
pub const F13: u16 = 1 << 13;
pub const F14: u16 = 1 << 14;

/// Bit position of the first flag that drives an output pin.
pub const FLAG_OUTPUT_SHIFT: u32 = 11;

/// Number of flag output pins.
pub const FLAG_OUTPUTS: usize = 4;

/// Per-level interrupt enable bit (`IE1`..`IE5`). Level 0 has none.
#[must_use]
pub const fn interrupt_enable(level: u8) -> u16 {
    if level == 0 || level > 5 { 0 } else { 1 << level }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_level_enables_match_named_bits() {
        assert_eq!(interrupt_enable(0), 0);
        assert_eq!(interrupt_enable(1), IE1);
        assert_eq!(interrupt_enable(5), IE5);
        assert_eq!(interrupt_enable(6), 0);
    }

    #[test]
    fn output_flags_occupy_bits_11_to_14() {
        assert_eq!(F11 | F12 | F13 | F14, 0x7800);
        assert_eq!(F11 >> FLAG_OUTPUT_SHIFT, 1);
    }
}
