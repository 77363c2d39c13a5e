//! XR68C681 register map
//!
//! The DUART decodes sixteen byte registers, two bytes apart, on one byte
//! lane. Most slots are a read register and a write register sharing an
//! address.

use lib_kernel::board::DuartLayout;
use lib_kernel::mmio::Reg8;

/// Status register bits
pub mod sr {
    pub const RXRDY: u8 = 1 << 0;
    pub const FFULL: u8 = 1 << 1;
    pub const TXRDY: u8 = 1 << 2;
    pub const TXEMT: u8 = 1 << 3;
    pub const OVERRUN: u8 = 1 << 4;
    pub const PARITY: u8 = 1 << 5;
    pub const FRAMING: u8 = 1 << 6;
    pub const BREAK: u8 = 1 << 7;

    pub const ERRORS: u8 = OVERRUN | PARITY | FRAMING | BREAK;
}

// Channel-independent slots
const SLOT_MISR: usize = 2;
const SLOT_ACR: usize = 4;
const SLOT_ISR_IMR: usize = 5;
const SLOT_IVR: usize = 12;
const SLOT_OPCR: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    /// First slot of the channel's MR/SR/CR/RB group
    const fn first_slot(self) -> usize {
        match self {
            Channel::A => 0,
            Channel::B => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuartRegs {
    /// Mode registers 1/2
    pub mr: Reg8,
    /// Status on read, clock select on write
    pub sr: Reg8,
    /// Command register (write only)
    pub cr: Reg8,
    /// Receive holding on read, transmit holding on write
    pub rhr: Reg8,
    /// Masked interrupt status. Shares a slot with channel A's command register.
    pub misr: Reg8,
    pub acr: Reg8,
    /// Interrupt status on read, interrupt mask on write
    pub imr: Reg8,
    pub ivr: Reg8,
    pub opcr: Reg8,
}

impl DuartRegs {
    pub const fn new(layout: DuartLayout, channel: Channel) -> Self {
        let first = channel.first_slot();
        DuartRegs {
            mr: slot(&layout, first),
            sr: slot(&layout, first + 1),
            cr: slot(&layout, first + 2),
            rhr: slot(&layout, first + 3),
            misr: slot(&layout, SLOT_MISR),
            acr: slot(&layout, SLOT_ACR),
            imr: slot(&layout, SLOT_ISR_IMR),
            ivr: slot(&layout, SLOT_IVR),
            opcr: slot(&layout, SLOT_OPCR),
        }
    }
}

const fn slot(layout: &DuartLayout, index: usize) -> Reg8 {
    Reg8::at(layout.slot(index), 0)
}

/// Status bits captured alongside a received character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct RxStatus(pub u8);

impl RxStatus {
    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_overrun(self) -> bool {
        self.0 & sr::OVERRUN != 0
    }

    pub fn is_parity_error(self) -> bool {
        self.0 & sr::PARITY != 0
    }

    pub fn is_framing_error(self) -> bool {
        self.0 & sr::FRAMING != 0
    }

    pub fn is_break(self) -> bool {
        self.0 & sr::BREAK != 0
    }

    pub fn has_error(self) -> bool {
        self.0 & sr::ERRORS != 0
    }
}

/// One receive event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxChar {
    pub ch: u8,
    pub status: RxStatus,
}
