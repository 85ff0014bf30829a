//! PACE register file.

use serde::{Deserialize, Serialize};

/// Depth of the on-chip LIFO stack.
pub const STACK_DEPTH: usize = 10;

/// PACE registers snapshot for observation.
///
/// Stack slots carry no type tag: a slot holds either a return address or a
/// data word pushed by software.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub pc: u16,
    /// Flag register. Bits 0 and 15 always read as 1.
    pub fr: u16,
    pub ac: [u16; 4],
    /// Stack pointer, always in `0..=9`.
    pub sp: u8,
    pub stk: [u16; STACK_DEPTH],
}

impl Default for Registers {
    /// Power-on contents, before the first reset.
    fn default() -> Self {
        Self {
            pc: 0,
            fr: 0xFFFF,
            ac: [0; 4],
            sp: 0,
            stk: [0; STACK_DEPTH],
        }
    }
}

/// Apply the stack pointer write rule.
///
/// Only the low four bits are significant. Values 0..=9 pass through; larger
/// values become 9 when odd and 0 when even. This is also how the pointer
/// wraps: incrementing 9 gives 10 (0) and decrementing 0 gives 15 (9).
#[must_use]
pub const fn clamp_stack_pointer(value: u8) -> u8 {
    let value = value & 0x0F;
    if value < STACK_DEPTH as u8 {
        value
    } else if value & 1 != 0 {
        9
    } else {
        0
    }
}

/// A register visible to debuggers, addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterId {
    Pc,
    Fr,
    Ac(u8),
    Sp,
    Stk(u8),
}

impl RegisterId {
    /// Every exported register, in save-state order.
    pub const ALL: [RegisterId; 17] = [
        RegisterId::Pc,
        RegisterId::Fr,
        RegisterId::Ac(0),
        RegisterId::Ac(1),
        RegisterId::Ac(2),
        RegisterId::Ac(3),
        RegisterId::Sp,
        RegisterId::Stk(0),
        RegisterId::Stk(1),
        RegisterId::Stk(2),
        RegisterId::Stk(3),
        RegisterId::Stk(4),
        RegisterId::Stk(5),
        RegisterId::Stk(6),
        RegisterId::Stk(7),
        RegisterId::Stk(8),
        RegisterId::Stk(9),
    ];

    /// Debugger name (`PC`, `FR`, `AC0`..`AC3`, `SP`, `STK0`..`STK9`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        const AC: [&str; 4] = ["AC0", "AC1", "AC2", "AC3"];
        const STK: [&str; STACK_DEPTH] = [
            "STK0", "STK1", "STK2", "STK3", "STK4", "STK5", "STK6", "STK7", "STK8", "STK9",
        ];
        match self {
            RegisterId::Pc => "PC",
            RegisterId::Fr => "FR",
            RegisterId::Ac(i) => AC[(i & 3) as usize],
            RegisterId::Sp => "SP",
            RegisterId::Stk(i) => {
                if (i as usize) < STACK_DEPTH {
                    STK[i as usize]
                } else {
                    "STK?"
                }
            }
        }
    }

    /// Look up a register by its debugger name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(name))
    }
}
