#![allow(unused)]

// ATA Status Register bits
pub const ATA_SR_BSY: u8 = 0x80;    // Busy
pub const ATA_SR_DRDY: u8 = 0x40;   // Drive ready
pub const ATA_SR_DF: u8 = 0x20;     // Drive write fault
pub const ATA_SR_DSC: u8 = 0x10;    // Drive seek complete
pub const ATA_SR_DRQ: u8 = 0x08;    // Data request ready
pub const ATA_SR_CORR: u8 = 0x04;   // Corrected data
pub const ATA_SR_IDX: u8 = 0x02;    // Index
pub const ATA_SR_ERR: u8 = 0x01;    // Error

// ATA Error Register bits
pub const ATA_ER_BBK: u8 = 0x80;    // Bad block
pub const ATA_ER_UNC: u8 = 0x40;    // Uncorrectable data
pub const ATA_ER_IDNF: u8 = 0x10;   // ID mark not found
pub const ATA_ER_ABRT: u8 = 0x04;   // Command aborted
pub const ATA_ER_AMNF: u8 = 0x01;   // No address mark

// Device control register bits
pub const ATA_DEVCTL_OBS: u8 = 0x08;
pub const ATA_SRST: u8 = 0x04;      // Software reset
pub const ATA_NIEN: u8 = 0x02;      // Interrupt disable

// Device select bits
pub const ATA_DEVICE_OBS: u8 = 0xA0; // Obsolete bits, must read as one
pub const ATA_LBA: u8 = 0x40;
pub const ATA_DEV1: u8 = 0x10;      // Slave

// ATA Commands
pub const ATA_CMD_READ_PIO: u8 = 0x20;
pub const ATA_CMD_READ_PIO_EXT: u8 = 0x24;
pub const ATA_CMD_WRITE_PIO: u8 = 0x30;
pub const ATA_CMD_WRITE_PIO_EXT: u8 = 0x34;
pub const ATA_CMD_CACHE_FLUSH: u8 = 0xE7;
pub const ATA_CMD_IDENTIFY: u8 = 0xEC;

// Register offsets from the Y Ddraig IDE window. Only even addresses are
// decoded; the data port is the one 16-bit register.
pub const IDE_REG_DATA: usize = 0x00;
pub const IDE_REG_FEATURE: usize = 0x02;    // Error on read
pub const IDE_REG_NSECT: usize = 0x04;
pub const IDE_REG_LBAL: usize = 0x06;
pub const IDE_REG_LBAM: usize = 0x08;
pub const IDE_REG_LBAH: usize = 0x0A;
pub const IDE_REG_DEVICE: usize = 0x0C;
pub const IDE_REG_STATUS: usize = 0x0E;     // Command on write
pub const IDE_REG_ALTSTATUS: usize = 0x8C;  // Device control on write

pub const SECTOR_SIZE: usize = 512;
