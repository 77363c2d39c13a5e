//! Board variant selection
//!
//! Two revisions of the board are in circulation. They differ in where the
//! XR68C681 DUART is decoded (base address and byte lane) and in whether the
//! DUART's counter/timer interrupt has to stay enabled alongside serial
//! reception. The choice is made once at startup and never changes.

use conquer_once::spin::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

pub const IRQ_NUM_IDE: u8 = 1;
pub const IRQ_NUM_TIMER: u8 = 2;
pub const IRQ_NUM_DUART: u8 = 3;

/// First user interrupt vector; the DUART's vector register is programmed
/// relative to this.
pub const VECTOR_BASE: u8 = 64;

/// DUART crystal
pub const DUART_CLOCK_HZ: u32 = 1_843_200;

/// DUART interrupt mask register bits
pub mod imr {
    /// Counter/timer ready, used as the system tick on some revisions
    pub const COUNTER: u8 = 0b0000_1000;
    /// Channel B receiver ready
    pub const RXRDY: u8 = 0b0010_0000;
    pub const NONE: u8 = 0;
}

/// Mask written on shutdown: no interrupt source left enabled.
pub const DISABLED_MASK: u8 = imr::NONE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardVariant {
    /// DUART at 0x00F7_F000 on even addresses. The counter interrupt drives
    /// the system tick and stays enabled in the startup and running masks.
    /// Shutdown writes `DISABLED_MASK`, which stops the counter too.
    RevA,
    /// DUART at 0x3C_0000 on odd addresses. Nothing else shares the mask.
    RevB,
}

impl BoardVariant {
    pub const fn keeps_counter(self) -> bool {
        matches!(self, BoardVariant::RevA)
    }
}

/// Mask to hold while the interrupt handler is being attached: reception
/// off, counter left as the variant needs it.
pub const fn startup_mask_for(variant: BoardVariant) -> u8 {
    if variant.keeps_counter() {
        imr::COUNTER
    } else {
        imr::NONE
    }
}

/// Mask to run with once the handler is attached.
pub const fn running_mask_for(variant: BoardVariant) -> u8 {
    startup_mask_for(variant) | imr::RXRDY
}

/// Where the DUART's sixteen registers are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuartLayout {
    pub base: usize,
    /// 0 for even byte lane, 1 for odd
    pub lane: usize,
}

impl DuartLayout {
    pub const REV_A: DuartLayout = DuartLayout { base: 0x00F7_F000, lane: 0 };
    pub const REV_B: DuartLayout = DuartLayout { base: 0x003C_0000, lane: 1 };

    /// Address of register slot `index` (0..16); slots are two bytes apart.
    pub const fn slot(&self, index: usize) -> usize {
        self.base + self.lane + 2 * index
    }
}

pub const IDE_BASE_REV_A: usize = 0x00F7_F300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub variant: BoardVariant,
    pub duart: DuartLayout,
    /// Base of the IDE register window, if the revision decodes one
    #[serde(default)]
    pub ide_base: Option<usize>,
}

impl BoardConfig {
    pub const fn for_variant(variant: BoardVariant) -> Self {
        match variant {
            BoardVariant::RevA => BoardConfig {
                variant,
                duart: DuartLayout::REV_A,
                ide_base: Some(IDE_BASE_REV_A),
            },
            BoardVariant::RevB => BoardConfig {
                variant,
                duart: DuartLayout::REV_B,
                ide_base: None,
            },
        }
    }
}

static SELECTED: OnceCell<BoardConfig> = OnceCell::uninit();

/// Publish the board configuration. Only the first call succeeds.
pub fn select(config: BoardConfig) -> KernelResult<&'static BoardConfig> {
    SELECTED
        .try_init_once(|| config)
        .map_err(|_| KernelError::AlreadyInitialized)?;
    SELECTED.get().ok_or(KernelError::NoDevice)
}

/// The published configuration, if startup got that far.
pub fn current() -> Option<&'static BoardConfig> {
    SELECTED.get()
}
