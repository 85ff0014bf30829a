//! Word-addressed memory bus interface.

/// Word-addressed memory bus.
///
/// The address space is 64K little-endian 16-bit words. Components access
/// memory and memory-mapped peripherals through this trait; the bus handles
/// address decoding and routing to the appropriate device.
///
/// Besides data access the bus also carries the signals a CPU samples at
/// instruction boundaries: device interrupt request lines, the wait-mode
/// request and the interrupt acknowledge cycle.
pub trait Bus {
    /// Read a word from the given word address.
    fn read(&mut self, address: u16) -> u16;

    /// Write a word to the given word address.
    fn write(&mut self, address: u16, value: u16);

    /// Fetch an instruction word.
    ///
    /// Separate from [`Bus::read`] so implementations can serve sequential
    /// opcode fetches from a decode cache. Must return what `read` would.
    fn fetch(&mut self, address: u16) -> u16 {
        self.read(address)
    }

    /// Read a byte using a byte address (low byte of a word first).
    fn read_byte(&mut self, address: u32) -> u8 {
        let word = self.read((address >> 1) as u16);
        if address & 1 == 0 {
            word as u8
        } else {
            (word >> 8) as u8
        }
    }

    /// Write a byte using a byte address, preserving the other half of the word.
    fn write_byte(&mut self, address: u32, value: u8) {
        let word_address = (address >> 1) as u16;
        let word = self.read(word_address);
        let merged = if address & 1 == 0 {
            (word & 0xFF00) | u16::from(value)
        } else {
            (word & 0x00FF) | (u16::from(value) << 8)
        };
        self.write(word_address, merged);
    }

    /// Interrupt acknowledge cycle for `level`.
    ///
    /// Returns the address of the handler the CPU should enter.
    fn acknowledge(&mut self, level: u8) -> u16;

    /// Interrupt request lines driven by devices on the bus, one bit per level.
    fn irq_lines(&mut self) -> u8 {
        0
    }

    /// Returns true once if a device asked the CPU to enter wait mode.
    fn take_wait_request(&mut self) -> bool {
        false
    }

    /// The CPU's on-chip stack overflowed or underflowed.
    fn stack_fault(&mut self) {}
}

/// Flat 64K-word RAM bus with a fixed vector table.
///
/// Useful for CPU tests and for systems with no memory-mapped devices.
pub struct SimpleBus {
    memory: Box<[u16; 0x10000]>,
    /// Handler address returned by the acknowledge cycle, per level.
    pub vectors: [u16; 8],
    /// Device-driven interrupt request lines.
    pub irq_lines: u8,
    /// Pending wait-mode request.
    pub wait_request: bool,
    /// Stack faults reported by the CPU.
    pub stack_faults: u32,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            vectors: [0; 8],
            irq_lines: 0,
            wait_request: false,
            stack_faults: 0,
        }
    }

    /// Copy words into memory starting at `address`, wrapping at the top.
    pub fn load(&mut self, address: u16, words: &[u16]) {
        for (i, &word) in words.iter().enumerate() {
            self.memory[address.wrapping_add(i as u16) as usize] = word;
        }
    }

    /// Read memory without bus side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u16 {
        self.memory[address as usize]
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u16 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u16) {
        self.memory[address as usize] = value;
    }

    fn acknowledge(&mut self, level: u8) -> u16 {
        self.vectors[(level & 7) as usize]
    }

    fn irq_lines(&mut self) -> u8 {
        self.irq_lines
    }

    fn take_wait_request(&mut self) -> bool {
        std::mem::take(&mut self.wait_request)
    }

    fn stack_fault(&mut self) {
        self.stack_faults += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_little_endian_within_a_word() {
        let mut bus = SimpleBus::new();
        bus.write(0x0010, 0xBEEF);
        assert_eq!(bus.read_byte(0x20), 0xEF);
        assert_eq!(bus.read_byte(0x21), 0xBE);
    }

    #[test]
    fn byte_write_preserves_other_half() {
        let mut bus = SimpleBus::new();
        bus.write(0x0010, 0x1234);
        bus.write_byte(0x21, 0xAB);
        assert_eq!(bus.peek(0x0010), 0xAB34);
        bus.write_byte(0x20, 0xCD);
        assert_eq!(bus.peek(0x0010), 0xABCD);
    }

    #[test]
    fn fetch_matches_read() {
        let mut bus = SimpleBus::new();
        bus.load(0xFFFF, &[0x1111, 0x2222]);
        assert_eq!(bus.fetch(0xFFFF), 0x1111);
        assert_eq!(bus.fetch(0x0000), 0x2222);
    }

    #[test]
    fn wait_request_is_taken_once() {
        let mut bus = SimpleBus::new();
        bus.wait_request = true;
        assert!(bus.take_wait_request());
        assert!(!bus.take_wait_request());
    }
}
