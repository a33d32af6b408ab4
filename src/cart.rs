//! Cartridge
//!
//! This module handles Game Boy cartridges: ROM header parsing and
//! validation, and the memory bank controller (MBC) that maps ROM and
//! external RAM into 0x0000-0x7FFF and 0xA000-0xBFFF.
//!
//! Mappers form a closed set selected from the header's cartridge type.

use crate::common::{Byte, Word};
use crate::error::HeaderError;
use serde::{Deserialize, Serialize};

/// ROM header offsets
const HEADER_TITLE_START: usize = 0x134;
const HEADER_TITLE_END: usize = 0x143;
const HEADER_CART_TYPE: usize = 0x147;
const HEADER_ROM_SIZE: usize = 0x148;
const HEADER_RAM_SIZE: usize = 0x149;
const HEADER_LIC_CODE: usize = 0x14B;
const HEADER_VERSION: usize = 0x14C;
const HEADER_CHECKSUM: usize = 0x14D;
const HEADER_END: usize = 0x150;

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;

/// MBC2 carries 512 half-bytes of RAM on the controller itself
const MBC2_RAM_SIZE: usize = 0x200;

/// ROM header information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomHeader {
    /// Game title (up to 16 characters)
    pub title: String,
    /// Cartridge type (MBC type)
    pub cart_type: Byte,
    /// ROM size code
    pub rom_size: Byte,
    /// RAM size code
    pub ram_size: Byte,
    /// License code
    pub lic_code: Byte,
    /// Version number
    pub version: Byte,
    /// Header checksum
    pub checksum: Byte,
}

impl RomHeader {
    /// Parse ROM header from ROM data
    pub fn parse(rom_data: &[Byte]) -> Result<Self, HeaderError> {
        if rom_data.len() < HEADER_END {
            return Err(HeaderError::TooShort(rom_data.len()));
        }

        // Extract title (null-terminated string)
        let title = rom_data[HEADER_TITLE_START..=HEADER_TITLE_END]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect();

        Ok(Self {
            title,
            cart_type: rom_data[HEADER_CART_TYPE],
            rom_size: rom_data[HEADER_ROM_SIZE],
            ram_size: rom_data[HEADER_RAM_SIZE],
            lic_code: rom_data[HEADER_LIC_CODE],
            version: rom_data[HEADER_VERSION],
            checksum: rom_data[HEADER_CHECKSUM],
        })
    }

    /// Get ROM size in bytes
    pub fn rom_size_bytes(&self) -> Result<usize, HeaderError> {
        match self.rom_size {
            0x00..=0x08 => Ok((32 * 1024) << self.rom_size as usize),
            code => Err(HeaderError::RomSizeCode(code)),
        }
    }

    /// Get RAM size in bytes
    pub fn ram_size_bytes(&self) -> Result<usize, HeaderError> {
        match self.ram_size {
            0 => Ok(0),
            1 => Ok(2048),
            2 => Ok(8192),
            3 => Ok(32768),
            4 => Ok(131072),
            5 => Ok(65536),
            code => Err(HeaderError::RamSizeCode(code)),
        }
    }

    /// Get cartridge type name
    pub fn cart_type_name(&self) -> &'static str {
        match self.cart_type {
            0x00 => "ROM ONLY",
            0x01 => "MBC1",
            0x02 => "MBC1+RAM",
            0x03 => "MBC1+RAM+BATTERY",
            0x05 => "MBC2",
            0x06 => "MBC2+BATTERY",
            0x08 => "ROM+RAM",
            0x09 => "ROM+RAM+BATTERY",
            0x0F => "MBC3+TIMER+BATTERY",
            0x10 => "MBC3+TIMER+RAM+BATTERY",
            0x11 => "MBC3",
            0x12 => "MBC3+RAM",
            0x13 => "MBC3+RAM+BATTERY",
            0x19 => "MBC5",
            0x1A => "MBC5+RAM",
            0x1B => "MBC5+RAM+BATTERY",
            0x1C => "MBC5+RUMBLE",
            0x1D => "MBC5+RUMBLE+RAM",
            0x1E => "MBC5+RUMBLE+RAM+BATTERY",
            _ => "UNKNOWN",
        }
    }

    /// Check if cartridge has battery backup
    pub fn has_battery(&self) -> bool {
        matches!(
            self.cart_type,
            0x03 | 0x06 | 0x09 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E
        )
    }
}

/// Compute the header checksum over 0x134-0x14C
pub fn header_checksum(rom_data: &[Byte]) -> Byte {
    rom_data[HEADER_TITLE_START..HEADER_CHECKSUM]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1))
}

/// Banking state of the memory bank controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mapper {
    /// 32KB ROM, optionally with up to 8KB RAM that is always enabled
    RomOnly,
    Mbc1 {
        ram_enabled: bool,
        /// Low five bank bits, never zero
        rom_bank: Byte,
        /// Two-bit register at 0x4000: upper ROM bits or RAM bank
        upper: Byte,
        /// Banking mode (0 = ROM, 1 = RAM / advanced)
        mode: Byte,
    },
    Mbc2 {
        ram_enabled: bool,
        rom_bank: Byte,
    },
    Mbc3 {
        ram_enabled: bool,
        rom_bank: Byte,
        /// 0x00-0x03 select a RAM bank, 0x08-0x0C an RTC register
        ram_select: Byte,
        /// RTC registers (S, M, H, DL, DH) as plain storage
        rtc: [Byte; 5],
    },
    Mbc5 {
        ram_enabled: bool,
        /// Nine-bit ROM bank number
        rom_bank: Word,
        ram_bank: Byte,
    },
}

impl Mapper {
    /// Pick the controller for a header cartridge type
    fn for_cart_type(cart_type: Byte) -> Result<Self, HeaderError> {
        match cart_type {
            0x00 | 0x08 | 0x09 => Ok(Mapper::RomOnly),
            0x01..=0x03 => Ok(Mapper::Mbc1 {
                ram_enabled: false,
                rom_bank: 1,
                upper: 0,
                mode: 0,
            }),
            0x05 | 0x06 => Ok(Mapper::Mbc2 {
                ram_enabled: false,
                rom_bank: 1,
            }),
            0x0F..=0x13 => Ok(Mapper::Mbc3 {
                ram_enabled: false,
                rom_bank: 1,
                ram_select: 0,
                rtc: [0; 5],
            }),
            0x19..=0x1E => Ok(Mapper::Mbc5 {
                ram_enabled: false,
                rom_bank: 1,
                ram_bank: 0,
            }),
            other => Err(HeaderError::UnsupportedType(other)),
        }
    }
}

/// Cartridge emulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cartridge {
    /// Parsed ROM header
    pub header: RomHeader,
    /// ROM data
    rom: Vec<Byte>,
    /// Cartridge RAM
    ram: Vec<Byte>,
    /// Banking controller state
    mapper: Mapper,
}

impl Cartridge {
    /// Validate a ROM image and build the cartridge it describes
    pub fn from_bytes(rom: Vec<Byte>) -> Result<Self, HeaderError> {
        let header = RomHeader::parse(&rom)?;

        let computed = header_checksum(&rom);
        if computed != header.checksum {
            return Err(HeaderError::Checksum {
                found: header.checksum,
                computed,
            });
        }

        let declared = header.rom_size_bytes()?;
        if declared != rom.len() {
            return Err(HeaderError::RomSizeMismatch {
                declared,
                actual: rom.len(),
            });
        }

        let mapper = Mapper::for_cart_type(header.cart_type)?;
        let ram_size = match mapper {
            Mapper::Mbc2 { .. } => MBC2_RAM_SIZE,
            _ => header.ram_size_bytes()?,
        };

        log::debug!(
            "cartridge {:?}: {} (0x{:02X}), {} KB ROM, {} B RAM",
            header.title,
            header.cart_type_name(),
            header.cart_type,
            rom.len() / 1024,
            ram_size
        );

        Ok(Self {
            header,
            rom,
            ram: vec![0; ram_size],
            mapper,
        })
    }

    /// External RAM contents
    pub fn ram(&self) -> &[Byte] {
        &self.ram
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Return the mapper to its power-on banking. RAM and RTC contents
    /// survive.
    pub fn reset(&mut self) {
        let saved_rtc = match &self.mapper {
            Mapper::Mbc3 { rtc, .. } => Some(*rtc),
            _ => None,
        };
        if let Ok(mapper) = Mapper::for_cart_type(self.header.cart_type) {
            self.mapper = mapper;
        }
        if let (Some(saved), Mapper::Mbc3 { rtc, .. }) = (saved_rtc, &mut self.mapper) {
            *rtc = saved;
        }
    }

    /// Number of 16KB ROM banks available in this cartridge
    fn rom_bank_count(&self) -> usize {
        (self.rom.len() / ROM_BANK_SIZE).max(1)
    }

    /// Number of 8KB RAM banks available in this cartridge
    fn ram_bank_count(&self) -> usize {
        (self.ram.len() / RAM_BANK_SIZE).max(1)
    }

    /// Bank visible at 0x0000-0x3FFF
    fn rom0_bank(&self) -> usize {
        match self.mapper {
            // In mode 1 the upper bits also apply to the bank 0 window
            Mapper::Mbc1 { upper, mode: 1, .. } => ((upper as usize) << 5) % self.rom_bank_count(),
            _ => 0,
        }
    }

    /// Bank visible at 0x4000-0x7FFF
    fn romx_bank(&self) -> usize {
        let bank = match self.mapper {
            Mapper::RomOnly => 1,
            Mapper::Mbc1 {
                rom_bank, upper, ..
            } => ((upper as usize) << 5) | rom_bank as usize,
            Mapper::Mbc2 { rom_bank, .. } | Mapper::Mbc3 { rom_bank, .. } => rom_bank as usize,
            Mapper::Mbc5 { rom_bank, .. } => rom_bank as usize,
        };
        bank % self.rom_bank_count()
    }

    /// Offset into `ram` for a 0xA000-0xBFFF access, or None when the RAM is
    /// disabled, absent or not selected
    fn ram_offset(&self, address: Word) -> Option<usize> {
        if self.ram.is_empty() {
            return None;
        }
        let local = (address as usize) - 0xA000;
        let bank = match self.mapper {
            Mapper::RomOnly => 0,
            Mapper::Mbc1 {
                ram_enabled: true,
                upper,
                mode,
                ..
            } => {
                if mode == 1 {
                    upper as usize
                } else {
                    0
                }
            }
            Mapper::Mbc2 {
                ram_enabled: true, ..
            } => return Some(local & (MBC2_RAM_SIZE - 1)),
            Mapper::Mbc3 {
                ram_enabled: true,
                ram_select: select @ 0x00..=0x03,
                ..
            } => select as usize,
            Mapper::Mbc5 {
                ram_enabled: true,
                ram_bank,
                ..
            } => ram_bank as usize,
            _ => return None,
        };
        let offset = (bank % self.ram_bank_count()) * RAM_BANK_SIZE + local;
        (offset < self.ram.len()).then_some(offset)
    }

    /// RTC register selected on an MBC3, if any
    fn rtc_index(&self) -> Option<usize> {
        match self.mapper {
            Mapper::Mbc3 {
                ram_enabled: true,
                ram_select: select @ 0x08..=0x0C,
                ..
            } => Some((select - 0x08) as usize),
            _ => None,
        }
    }

    /// Read from cartridge
    pub fn read(&self, address: Word) -> Byte {
        match address {
            0x0000..=0x3FFF => {
                let addr = self.rom0_bank() * ROM_BANK_SIZE + address as usize;
                self.rom.get(addr).copied().unwrap_or(0xFF)
            }
            0x4000..=0x7FFF => {
                let addr = self.romx_bank() * ROM_BANK_SIZE + (address as usize - 0x4000);
                self.rom.get(addr).copied().unwrap_or(0xFF)
            }
            0xA000..=0xBFFF => {
                if let Some(index) = self.rtc_index() {
                    if let Mapper::Mbc3 { rtc, .. } = &self.mapper {
                        return rtc[index];
                    }
                }
                match self.ram_offset(address) {
                    Some(offset) if matches!(self.mapper, Mapper::Mbc2 { .. }) => {
                        self.ram[offset] | 0xF0
                    }
                    Some(offset) => self.ram[offset],
                    None => 0xFF,
                }
            }
            _ => 0xFF,
        }
    }

    /// Write to cartridge (MBC registers or RAM)
    pub fn write(&mut self, address: Word, value: Byte) {
        match address {
            0x0000..=0x7FFF => self.write_control(address, value),
            0xA000..=0xBFFF => {
                if let Some(index) = self.rtc_index() {
                    if let Mapper::Mbc3 { rtc, .. } = &mut self.mapper {
                        rtc[index] = value;
                    }
                    return;
                }
                if let Some(offset) = self.ram_offset(address) {
                    self.ram[offset] = match self.mapper {
                        Mapper::Mbc2 { .. } => value & 0x0F,
                        _ => value,
                    };
                }
            }
            _ => {}
        }
    }

    /// Writes into the ROM window land on controller registers
    fn write_control(&mut self, address: Word, value: Byte) {
        match &mut self.mapper {
            Mapper::RomOnly => {
                log::trace!("ignored ROM write {:#06X} <- {:#04X}", address, value);
            }
            Mapper::Mbc1 {
                ram_enabled,
                rom_bank,
                upper,
                mode,
            } => match address {
                0x0000..=0x1FFF => *ram_enabled = (value & 0x0F) == 0x0A,
                0x2000..=0x3FFF => *rom_bank = (value & 0x1F).max(1),
                0x4000..=0x5FFF => *upper = value & 0x03,
                _ => *mode = value & 0x01,
            },
            Mapper::Mbc2 {
                ram_enabled,
                rom_bank,
            } => {
                // Address bit 8 picks the register
                if address <= 0x3FFF {
                    if address & 0x0100 == 0 {
                        *ram_enabled = (value & 0x0F) == 0x0A;
                    } else {
                        *rom_bank = (value & 0x0F).max(1);
                    }
                }
            }
            Mapper::Mbc3 {
                ram_enabled,
                rom_bank,
                ram_select,
                ..
            } => match address {
                0x0000..=0x1FFF => *ram_enabled = (value & 0x0F) == 0x0A,
                0x2000..=0x3FFF => *rom_bank = (value & 0x7F).max(1),
                0x4000..=0x5FFF => *ram_select = value,
                // Latch clock data: there is no running clock to latch
                _ => {}
            },
            Mapper::Mbc5 {
                ram_enabled,
                rom_bank,
                ram_bank,
            } => match address {
                0x0000..=0x1FFF => *ram_enabled = (value & 0x0F) == 0x0A,
                0x2000..=0x2FFF => *rom_bank = (*rom_bank & 0x100) | value as Word,
                0x3000..=0x3FFF => *rom_bank = (*rom_bank & 0xFF) | (((value & 0x01) as Word) << 8),
                0x4000..=0x5FFF => *ram_bank = value & 0x0F,
                _ => {}
            },
        }
    }

    /// Check that the RAM buffer matches what the header implies. Used when a
    /// snapshot is restored.
    pub fn is_well_formed(&self) -> bool {
        let expected_ram = match self.mapper {
            Mapper::Mbc2 { .. } => Ok(MBC2_RAM_SIZE),
            _ => self.header.ram_size_bytes(),
        };
        expected_ram == Ok(self.ram.len())
            && self.header.rom_size_bytes() == Ok(self.rom.len())
    }
}
