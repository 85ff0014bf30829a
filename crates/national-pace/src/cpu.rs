//! PACE execution engine.

use tracing::{debug, warn};

use emu_core::{Bus, Cpu, MasterClock, Observable, Ticks, Value};

use crate::error::ConfigError;
use crate::flags::{BYTE, CRY, FLAG_OUTPUTS, IEN, LINK, OVF};
use crate::interrupt::InterruptLevel;
use crate::isa::{CLOCKS_PER_MACHINE_CYCLE, InstructionSet, Outcome};
use crate::processor::{Core, DebugHook, ExtendInput, FlagOutput, JumpCondition};
use crate::registers::{RegisterId, Registers};
use crate::state::CpuState;
use crate::variant::Variant;

/// Why a call to [`Pace::run_for`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The cycle budget was spent (possibly halted in wait mode).
    BudgetExhausted,
    /// An interrupt was recognised and its handler entered.
    Interrupt(InterruptLevel),
}

/// Outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: Ticks,
    pub instructions: u64,
    pub exit: Exit,
}

/// Collects pin connections and checks them before a [`Pace`] exists.
pub struct PaceBuilder {
    variant: Variant,
    clock_hz: Option<u64>,
    flag_outputs: [Option<FlagOutput>; FLAG_OUTPUTS],
    jump_conditions: [Option<JumpCondition>; 3],
    debug_hook: Option<DebugHook>,
    extend_input: Option<ExtendInput>,
    extend_stretch: u32,
    bad_pin: Option<ConfigError>,
}

impl PaceBuilder {
    #[must_use]
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            clock_hz: None,
            flag_outputs: [None, None, None, None],
            jump_conditions: [None, None, None],
            debug_hook: None,
            extend_input: None,
            extend_stretch: 1,
            bad_pin: None,
        }
    }

    /// Input clock frequency. Defaults to the variant's fastest legal clock.
    #[must_use]
    pub fn clock(mut self, hz: u64) -> Self {
        self.clock_hz = Some(hz);
        self
    }

    /// Connect flag output F11 + `index`.
    #[must_use]
    pub fn flag_output(mut self, index: usize, output: impl FnMut(bool) + 'static) -> Self {
        match self.flag_outputs.get_mut(index) {
            Some(slot) => *slot = Some(Box::new(output)),
            None => self.bad_pin = Some(ConfigError::NoSuchPin { pin: "flag output", index }),
        }
        self
    }

    /// Connect jump condition input JC13 + `index`.
    #[must_use]
    pub fn jump_condition(mut self, index: usize, input: impl FnMut() -> bool + 'static) -> Self {
        match self.jump_conditions.get_mut(index) {
            Some(slot) => *slot = Some(Box::new(input)),
            None => self.bad_pin = Some(ConfigError::NoSuchPin { pin: "jump condition", index }),
        }
        self
    }

    /// Instruction hook, called with PC before each instruction executes.
    #[must_use]
    pub fn debug_hook(mut self, hook: impl FnMut(u16) + 'static) -> Self {
        self.debug_hook = Some(Box::new(hook));
        self
    }

    /// EXTEND source sampled at every machine cycle, for devices that hold
    /// the line for part of an instruction. Optional; the pin set through
    /// [`Pace::set_extend`] still applies.
    #[must_use]
    pub fn extend_input(mut self, input: impl FnMut() -> bool + 'static) -> Self {
        self.extend_input = Some(Box::new(input));
        self
    }

    /// Clocks added per machine cycle while EXTEND is asserted.
    #[must_use]
    pub fn extend_stretch(mut self, clocks: u32) -> Self {
        self.extend_stretch = clocks;
        self
    }

    /// Check the configuration and create the CPU in its power-on state.
    ///
    /// Call [`Pace::reset`] before running, as the reset pin would.
    pub fn build<I: InstructionSet>(self, isa: I) -> Result<Pace<I>, ConfigError> {
        if let Some(err) = self.bad_pin {
            return Err(err);
        }

        let hz = self.clock_hz.unwrap_or_else(|| self.variant.default_clock());
        let range = self.variant.clock_range();
        if !range.contains(&hz) {
            return Err(ConfigError::ClockOutOfRange {
                variant: self.variant,
                hz,
                min: *range.start(),
                max: *range.end(),
            });
        }

        let [f11, f12, f13, f14] = self.flag_outputs;
        let flag_outputs = [
            f11.ok_or(ConfigError::MissingFlagOutput(0))?,
            f12.ok_or(ConfigError::MissingFlagOutput(1))?,
            f13.ok_or(ConfigError::MissingFlagOutput(2))?,
            f14.ok_or(ConfigError::MissingFlagOutput(3))?,
        ];
        let [jc13, jc14, jc15] = self.jump_conditions;
        let jump_conditions = [
            jc13.ok_or(ConfigError::MissingJumpCondition(0))?,
            jc14.ok_or(ConfigError::MissingJumpCondition(1))?,
            jc15.ok_or(ConfigError::MissingJumpCondition(2))?,
        ];

        Ok(Pace {
            core: Core::new(
                flag_outputs,
                jump_conditions,
                self.extend_input,
                self.extend_stretch,
            ),
            isa,
            variant: self.variant,
            clock: MasterClock::new(hz),
            debug_hook: self.debug_hook,
            total_ticks: Ticks::ZERO,
        })
    }
}

/// PACE / INS8900 CPU.
///
/// The CPU does not own the bus. It is passed to [`Pace::run_for`] so the
/// owning system keeps its peripherals reachable between runs.
pub struct Pace<I> {
    core: Core,
    isa: I,
    variant: Variant,
    clock: MasterClock,
    debug_hook: Option<DebugHook>,
    total_ticks: Ticks,
}

impl<I: InstructionSet> Pace<I> {
    #[must_use]
    pub fn builder(variant: Variant) -> PaceBuilder {
        PaceBuilder::new(variant)
    }

    /// Execute instructions until `budget` clock ticks are spent or an
    /// interrupt handler is entered.
    ///
    /// Interrupts are only recognised between instructions. The debug hook
    /// sees PC before the instruction at that address mutates anything.
    pub fn run_for<B: Bus>(&mut self, bus: &mut B, budget: Ticks) -> RunSummary {
        let budget = budget.get();
        let mut spent = 0u64;
        let mut instructions = 0u64;
        let mut exit = Exit::BudgetExhausted;

        while spent < budget {
            let lines = bus.irq_lines();
            if let Some(level) = self.core.irq.highest(lines, self.core.regs.fr) {
                spent += u64::from(self.core.enter_interrupt(bus, level));
                self.report_stack_fault(bus);
                exit = Exit::Interrupt(level);
                break;
            }

            if self.core.halted {
                spent = budget;
                break;
            }

            let pc = self.core.regs.pc;
            if let Some(hook) = self.debug_hook.as_mut() {
                hook(pc);
            }

            let opcode = bus.fetch(pc);
            self.core.regs.pc = pc.wrapping_add(1);
            let cycles = match self.isa.execute(&mut self.core, bus, opcode) {
                Outcome::Executed { cycles } => cycles,
                Outcome::Illegal => {
                    warn!(pc, opcode = format_args!("{opcode:#06x}"), "illegal opcode");
                    CLOCKS_PER_MACHINE_CYCLE
                }
            };
            spent += u64::from(self.core.stretched(cycles));
            instructions += 1;
            self.report_stack_fault(bus);

            if bus.take_wait_request() {
                debug!(pc = self.core.regs.pc, "entering wait mode");
                self.core.halted = true;
            }
        }

        let ticks = Ticks::new(spent);
        self.total_ticks += ticks;
        RunSummary {
            ticks,
            instructions,
            exit,
        }
    }

    fn report_stack_fault<B: Bus>(&mut self, bus: &mut B) {
        if std::mem::take(&mut self.core.stack_fault) {
            bus.stack_fault();
        }
    }

    /// Drive an interrupt request pin.
    ///
    /// Level 1 belongs to the on-chip stack and cannot be driven from outside;
    /// the call is refused and returns false.
    pub fn signal_interrupt(&mut self, level: InterruptLevel, state: bool) -> bool {
        let accepted = self.core.irq.set_pin(level, state);
        if !accepted {
            warn!(?level, "internal interrupt level cannot be driven from a pin");
        }
        accepted
    }

    /// Drive the EXTEND pin. The level holds for whole instructions; use
    /// [`PaceBuilder::extend_input`] to change it between machine cycles.
    pub fn set_extend(&mut self, state: bool) {
        self.core.set_extend(state);
    }

    /// Write the flag register through the pin-driving path.
    pub fn set_flags(&mut self, value: u16) {
        self.core.set_flags(value);
    }

    /// Write the stack pointer through the clamp rule.
    pub fn set_stack_pointer(&mut self, value: u8) {
        self.core.set_stack_pointer(value);
    }

    /// Install or replace the instruction hook.
    pub fn set_debug_hook(&mut self, hook: Option<DebugHook>) {
        self.debug_hook = hook;
    }

    #[must_use]
    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[must_use]
    pub fn clock(&self) -> MasterClock {
        self.clock
    }

    #[must_use]
    pub fn total_ticks(&self) -> Ticks {
        self.total_ticks
    }

    /// Read an exported register.
    #[must_use]
    pub fn read_register(&self, id: RegisterId) -> u16 {
        let regs = &self.core.regs;
        match id {
            RegisterId::Pc => regs.pc,
            RegisterId::Fr => regs.fr,
            RegisterId::Ac(i) => regs.ac[(i & 3) as usize],
            RegisterId::Sp => u16::from(regs.sp),
            RegisterId::Stk(i) => regs.stk.get(i as usize).copied().unwrap_or(0),
        }
    }

    /// Write an exported register.
    ///
    /// FR goes through the flag-write path and SP through the clamp rule,
    /// exactly as an instruction would.
    pub fn write_register(&mut self, id: RegisterId, value: u16) {
        match id {
            RegisterId::Pc => self.core.regs.pc = value,
            RegisterId::Fr => self.core.set_flags(value),
            RegisterId::Ac(i) => self.core.set_ac(i as usize, value),
            RegisterId::Sp => self.core.set_stack_pointer(value as u8),
            RegisterId::Stk(i) => {
                if let Some(slot) = self.core.regs.stk.get_mut(i as usize) {
                    *slot = value;
                }
            }
        }
    }

    /// Capture the state at the current instruction boundary.
    #[must_use]
    pub fn save_state(&self) -> CpuState {
        self.core.save(self.total_ticks)
    }

    /// Restore a captured state. Output pins are not driven.
    pub fn restore_state(&mut self, state: &CpuState) {
        self.core.restore(state);
        self.total_ticks = state.ticks;
    }
}

impl<I: InstructionSet> Cpu for Pace<I> {
    type Registers = Registers;

    fn run<B: Bus>(&mut self, bus: &mut B, budget: Ticks) -> Ticks {
        self.run_for(bus, budget).ticks
    }

    fn pc(&self) -> u16 {
        self.core.regs.pc
    }

    fn registers(&self) -> Registers {
        self.core.regs
    }

    fn is_halted(&self) -> bool {
        self.core.halted
    }

    /// PC = 0, FR = 0x8001 via the flag-write path, SP = 0. Latched interrupt
    /// requests are discarded.
    fn reset(&mut self) {
        self.core.reset();
    }
}

/// All query paths supported by the PACE.
const PACE_QUERY_PATHS: &[&str] = &[
    "pc", "fr", "ac0", "ac1", "ac2", "ac3", "sp",
    "stk0", "stk1", "stk2", "stk3", "stk4", "stk5", "stk6", "stk7", "stk8", "stk9",
    "stk", "stack_depth",
    "flags.ovf", "flags.cry", "flags.link", "flags.ien", "flags.byte",
    "flags.f11", "flags.f12", "flags.f13", "flags.f14",
    "interrupts.requests", "extend", "halted", "ticks", "variant", "clock_hz",
];

impl<I: InstructionSet> Observable for Pace<I> {
    fn query(&self, path: &str) -> Option<Value> {
        let regs = &self.core.regs;
        if let Some(id) = RegisterId::from_name(path) {
            return Some(self.read_register(id).into());
        }
        let flag = |bit: u16| Some(Value::Bool(regs.fr & bit != 0));
        match path {
            "stk" => Some(regs.stk.as_slice().into()),
            "stack_depth" => Some(self.core.stack_depth().into()),
            "flags.ovf" => flag(OVF),
            "flags.cry" => flag(CRY),
            "flags.link" => flag(LINK),
            "flags.ien" => flag(IEN),
            "flags.byte" => flag(BYTE),
            "flags.f11" => flag(1 << 11),
            "flags.f12" => flag(1 << 12),
            "flags.f13" => flag(1 << 13),
            "flags.f14" => flag(1 << 14),
            "interrupts.requests" => Some(self.core.irq.requests(0).into()),
            "extend" => Some(self.core.extend().into()),
            "halted" => Some(self.core.halted.into()),
            "ticks" => Some(self.total_ticks.get().into()),
            "variant" => Some(self.variant.name().into()),
            "clock_hz" => Some(self.clock.frequency_hz.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        PACE_QUERY_PATHS
    }
}
