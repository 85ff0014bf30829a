//! Register file with its invariant-preserving mutators and external pins.

use tracing::{debug, trace};

use emu_core::{Bus, Ticks};

use crate::flags::{FLAG_OUTPUT_SHIFT, FR_FIXED, FLAG_OUTPUTS, IEN};
use crate::interrupt::{InterruptLevel, InterruptUnit};
use crate::isa::{CLOCKS_PER_MACHINE_CYCLE, INTERRUPT_ENTRY_CYCLES};
use crate::registers::{clamp_stack_pointer, Registers, STACK_DEPTH};
use crate::state::CpuState;

/// Output pin driven by one of flags F11..F14. Called with the new level.
pub type FlagOutput = Box<dyn FnMut(bool)>;

/// Jump condition input pin JC13..JC15.
pub type JumpCondition = Box<dyn FnMut() -> bool>;

/// EXTEND input sampled once per machine cycle.
pub type ExtendInput = Box<dyn FnMut() -> bool>;

/// Called with PC before the instruction at that address executes.
pub type DebugHook = Box<dyn FnMut(u16)>;

/// Architectural state plus the pins it drives and samples.
///
/// Instruction sets manipulate the CPU only through this type.
pub struct Core {
    pub(crate) regs: Registers,
    /// Words on the stack; tracks full/empty independently of SP wrap.
    stack_depth: u8,
    pub(crate) irq: InterruptUnit,
    flag_outputs: [FlagOutput; FLAG_OUTPUTS],
    jump_conditions: [JumpCondition; 3],
    extend: bool,
    extend_input: Option<ExtendInput>,
    /// Clocks added to every machine cycle while EXTEND is asserted.
    extend_stretch: u32,
    pub(crate) halted: bool,
    /// Set by a stack overflow or underflow until the run loop reports it.
    pub(crate) stack_fault: bool,
}

impl Core {
    pub(crate) fn new(
        flag_outputs: [FlagOutput; FLAG_OUTPUTS],
        jump_conditions: [JumpCondition; 3],
        extend_input: Option<ExtendInput>,
        extend_stretch: u32,
    ) -> Self {
        Self {
            regs: Registers::default(),
            stack_depth: 0,
            irq: InterruptUnit::default(),
            flag_outputs,
            jump_conditions,
            extend: false,
            extend_input,
            extend_stretch,
            halted: false,
            stack_fault: false,
        }
    }

    #[must_use]
    pub fn registers(&self) -> Registers {
        self.regs
    }

    #[must_use]
    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    pub fn set_pc(&mut self, value: u16) {
        self.regs.pc = value;
    }

    #[must_use]
    pub fn ac(&self, index: usize) -> u16 {
        self.regs.ac[index & 3]
    }

    pub fn set_ac(&mut self, index: usize, value: u16) {
        self.regs.ac[index & 3] = value;
    }

    #[must_use]
    pub fn fr(&self) -> u16 {
        self.regs.fr
    }

    /// Write the flag register.
    ///
    /// Each of F11..F14 whose level changes calls its output pin once, in bit
    /// order, with the new level. Bits 0 and 15 are then forced high.
    pub fn set_flags(&mut self, value: u16) {
        for (i, output) in self.flag_outputs.iter_mut().enumerate() {
            let bit = FLAG_OUTPUT_SHIFT + i as u32;
            let new = (value >> bit) & 1 != 0;
            let old = (self.regs.fr >> bit) & 1 != 0;
            if new != old {
                output(new);
            }
        }
        self.regs.fr = value | FR_FIXED;
    }

    #[must_use]
    pub fn sp(&self) -> u8 {
        self.regs.sp
    }

    /// Write the stack pointer through the clamp rule.
    ///
    /// The stack is taken to hold as many words as the new pointer value.
    pub fn set_stack_pointer(&mut self, value: u8) {
        let sp = clamp_stack_pointer(value);
        self.regs.sp = sp;
        self.stack_depth = sp;
    }

    #[must_use]
    pub fn stack_depth(&self) -> u8 {
        self.stack_depth
    }

    /// Push a word on the hardware stack.
    ///
    /// Pushing onto a full stack overwrites the oldest word and raises the
    /// level 1 interrupt.
    pub fn push(&mut self, value: u16) {
        let sp = self.regs.sp;
        self.regs.stk[sp as usize] = value;
        self.regs.sp = clamp_stack_pointer(sp + 1);
        if self.stack_depth as usize == STACK_DEPTH {
            debug!(pc = self.regs.pc, "stack overflow");
            self.raise_stack_fault();
        } else {
            self.stack_depth += 1;
        }
    }

    /// Pull a word from the hardware stack.
    ///
    /// Pulling from an empty stack returns whatever the slot holds and raises
    /// the level 1 interrupt.
    pub fn pull(&mut self) -> u16 {
        let sp = clamp_stack_pointer(self.regs.sp.wrapping_sub(1));
        self.regs.sp = sp;
        if self.stack_depth == 0 {
            debug!(pc = self.regs.pc, "stack underflow");
            self.raise_stack_fault();
        } else {
            self.stack_depth -= 1;
        }
        self.regs.stk[sp as usize]
    }

    fn raise_stack_fault(&mut self) {
        self.irq.raise_stack();
        self.stack_fault = true;
    }

    /// Sample jump condition input JC13 + `index`.
    pub fn jump_condition(&mut self, index: usize) -> bool {
        self.jump_conditions.get_mut(index).is_some_and(|input| input())
    }

    #[must_use]
    pub fn extend(&self) -> bool {
        self.extend
    }

    pub(crate) fn set_extend(&mut self, state: bool) {
        self.extend = state;
    }

    /// Clock cost of `cycles`. Each machine cycle is stretched if the EXTEND
    /// pin is high or the extend input, sampled for that cycle, is high.
    pub(crate) fn stretched(&mut self, cycles: u32) -> u32 {
        let machine_cycles = cycles.div_ceil(CLOCKS_PER_MACHINE_CYCLE);
        let pin = self.extend;
        let extended = match self.extend_input.as_mut() {
            Some(input) => (0..machine_cycles).map(|_| u32::from(input() || pin)).sum(),
            None if pin => machine_cycles,
            None => 0,
        };
        cycles + extended * self.extend_stretch
    }

    /// Enter the handler for `level`. Returns the clock cost.
    pub(crate) fn enter_interrupt<B: Bus>(&mut self, bus: &mut B, level: InterruptLevel) -> u32 {
        self.irq.acknowledge(level);
        self.halted = false;
        let return_address = self.regs.pc;
        self.push(return_address);
        self.set_flags(self.regs.fr & !IEN);
        self.regs.pc = bus.acknowledge(level.index());
        trace!(?level, from = return_address, to = self.regs.pc, "interrupt entry");
        self.stretched(INTERRUPT_ENTRY_CYCLES)
    }

    pub(crate) fn reset(&mut self) {
        self.regs.pc = 0;
        self.set_flags(0);
        self.regs.sp = 0;
        self.stack_depth = 0;
        self.irq.reset();
        self.halted = false;
        self.stack_fault = false;
    }

    pub(crate) fn save(&self, ticks: Ticks) -> CpuState {
        CpuState {
            regs: self.regs,
            stack_depth: self.stack_depth,
            interrupts: self.irq.save(),
            extend: self.extend,
            halted: self.halted,
            ticks,
        }
    }

    /// Restore raw state. The flag register is loaded without driving pins.
    pub(crate) fn restore(&mut self, state: &CpuState) {
        self.regs = state.regs;
        self.regs.fr |= FR_FIXED;
        self.regs.sp = clamp_stack_pointer(state.regs.sp);
        self.stack_depth = state.stack_depth.min(STACK_DEPTH as u8);
        self.irq.restore(&state.interrupts);
        self.extend = state.extend;
        self.halted = state.halted;
    }
}
