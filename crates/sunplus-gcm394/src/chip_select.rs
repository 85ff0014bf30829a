//! Chip-select router.
//!
//! Five chip selects share the linear space above a fixed per-variant base.
//! CS`n` control bits 8..15 give the region size in 64K-word units, minus
//! one; regions are laid out back to back from the base in CS order. Any
//! control write recomputes all five and hands them to the owner.

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CHIP_SELECTS: usize = 5;

/// Region size granule in words.
const REGION_UNIT: u32 = 0x1_0000;

/// One chip-select's window in linear word addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipSelectRegion {
    pub start: u32,
    pub size: u32,
    /// Raw control word.
    pub control: u16,
}

impl ChipSelectRegion {
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.start + self.size
    }

    #[must_use]
    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && address < self.end()
    }
}

/// Receives the five recomputed regions.
pub type RemapCallback = Box<dyn FnMut(&[ChipSelectRegion; CHIP_SELECTS])>;

pub struct ChipSelectRouter {
    base: u32,
    controls: [u16; CHIP_SELECTS],
    regions: [ChipSelectRegion; CHIP_SELECTS],
    remap: RemapCallback,
}

impl ChipSelectRouter {
    #[must_use]
    pub fn new(base: u32, remap: RemapCallback) -> Self {
        let mut router = Self {
            base,
            controls: [0; CHIP_SELECTS],
            regions: [ChipSelectRegion::default(); CHIP_SELECTS],
            remap,
        };
        router.regions = router.compute();
        router
    }

    /// Fixed at construction.
    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[must_use]
    pub fn controls(&self) -> [u16; CHIP_SELECTS] {
        self.controls
    }

    #[must_use]
    pub fn regions(&self) -> &[ChipSelectRegion; CHIP_SELECTS] {
        &self.regions
    }

    /// Chip select whose region holds linear `address`, if any.
    #[must_use]
    pub fn select(&self, address: u32) -> Option<usize> {
        self.regions.iter().position(|r| r.contains(address))
    }

    /// Store CS`index` control and remap. Out-of-range indices are ignored.
    pub fn write_control(&mut self, index: usize, value: u16) {
        let Some(control) = self.controls.get_mut(index) else {
            return;
        };
        *control = value;
        self.remap();
    }

    fn compute(&self) -> [ChipSelectRegion; CHIP_SELECTS] {
        let mut start = self.base;
        self.controls.map(|control| {
            let size = (u32::from(control >> 8) + 1) * REGION_UNIT;
            let region = ChipSelectRegion { start, size, control };
            start += size;
            region
        })
    }

    fn remap(&mut self) {
        self.regions = self.compute();
        debug!(
            cs0 = format_args!("{:#x}", self.regions[0].start),
            cs4_end = format_args!("{:#x}", self.regions[4].end()),
            "chip-select remap"
        );
        (self.remap)(&self.regions);
    }

    /// Clear every control and announce the default layout.
    pub fn reset(&mut self) {
        self.controls = [0; CHIP_SELECTS];
        self.remap();
    }

    /// Reload controls and announce the restored layout.
    pub fn restore(&mut self, controls: [u16; CHIP_SELECTS]) {
        self.controls = controls;
        self.remap();
    }
}

impl std::fmt::Debug for ChipSelectRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChipSelectRouter")
            .field("base", &self.base)
            .field("controls", &self.controls)
            .finish_non_exhaustive()
    }
}
