use core::ops::BitOr;
use lib_kernel::mmio::{Reg16, Reg8};

use crate::consts::*;

/// Register addresses of one IDE interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdeRegs {
    pub data: Reg16,
    pub feature: Reg8,
    pub nsect: Reg8,
    pub lbal: Reg8,
    pub lbam: Reg8,
    pub lbah: Reg8,
    pub device: Reg8,
    /// Status on read, command on write
    pub status: Reg8,
    /// Alternate status on read, device control on write
    pub altstatus: Reg8,
}

impl IdeRegs {
    pub const fn ddraig(base: usize) -> Self {
        IdeRegs {
            data: Reg16::at(base, IDE_REG_DATA),
            feature: Reg8::at(base, IDE_REG_FEATURE),
            nsect: Reg8::at(base, IDE_REG_NSECT),
            lbal: Reg8::at(base, IDE_REG_LBAL),
            lbam: Reg8::at(base, IDE_REG_LBAM),
            lbah: Reg8::at(base, IDE_REG_LBAH),
            device: Reg8::at(base, IDE_REG_DEVICE),
            status: Reg8::at(base, IDE_REG_STATUS),
            altstatus: Reg8::at(base, IDE_REG_ALTSTATUS),
        }
    }

    pub fn base(&self) -> usize {
        self.data.addr()
    }
}

/// One ATA command exchange's register values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Taskfile {
    /// Features on load, error on read
    pub feature: u8,
    pub nsect: u8,
    pub lbal: u8,
    pub lbam: u8,
    pub lbah: u8,
    pub device: u8,
    /// Command on issue, status on completion
    pub command: u8,
}

impl Taskfile {
    pub fn error(&self) -> u8 {
        self.feature
    }

    /// 28-bit LBA addressing: low 24 bits in the LBA registers, the top
    /// nibble in the device register.
    pub fn lba28(lba: u32, nsect: u8, dev1: bool) -> Self {
        let mut device = ATA_LBA | ((lba >> 24) & 0x0F) as u8;
        if dev1 {
            device |= ATA_DEV1;
        }
        Taskfile {
            nsect,
            lbal: lba as u8,
            lbam: (lba >> 8) as u8,
            lbah: (lba >> 16) as u8,
            device,
            ..Taskfile::default()
        }
    }
}

/// Which taskfile fields a load or read touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TfValid(u8);

impl TfValid {
    pub const NONE: TfValid = TfValid(0);
    pub const ERROR: TfValid = TfValid(1 << 1);
    pub const FEATURE: TfValid = TfValid::ERROR;
    pub const NSECT: TfValid = TfValid(1 << 2);
    pub const LBAL: TfValid = TfValid(1 << 3);
    pub const LBAM: TfValid = TfValid(1 << 4);
    pub const LBAH: TfValid = TfValid(1 << 5);
    pub const DEVICE: TfValid = TfValid(1 << 6);

    pub const LBA: TfValid = TfValid(Self::LBAL.0 | Self::LBAM.0 | Self::LBAH.0);
    pub const OUT_TF: TfValid = TfValid(Self::FEATURE.0 | Self::NSECT.0 | Self::LBA.0);
    pub const IN_TF: TfValid = TfValid(Self::NSECT.0 | Self::LBA.0);
    pub const OUT_HOB: TfValid = Self::OUT_TF;
    pub const IN_HOB: TfValid = TfValid(Self::ERROR.0 | Self::NSECT.0 | Self::LBA.0);
    pub const ALL: TfValid = TfValid(Self::OUT_TF.0 | Self::DEVICE.0);

    pub const fn from_bits(bits: u8) -> Self {
        TfValid(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn has(self, field: TfValid) -> bool {
        self.0 & field.0 == field.0
    }
}

impl BitOr for TfValid {
    type Output = TfValid;

    fn bitor(self, rhs: TfValid) -> TfValid {
        TfValid(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chipset {
    Generic,
}

/// Host capability flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostFlags(u32);

impl HostFlags {
    pub const NO_DMA: HostFlags = HostFlags(1 << 0);

    pub const fn contains(self, other: HostFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// What the block layer needs to know to bind an IDE host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdePortInfo {
    pub name: &'static str,
    pub host_flags: HostFlags,
    pub chipset: Chipset,
    pub irq: u8,
    pub data_addr: usize,
}
