//! Status vectors spread over consecutive registers, one bit per port.

use crate::backend::RegisterBackend;
use crate::bitfield::{FieldValue, Flags, parse_number};
use crate::error::{Error, Result};

/// Up to eight consecutive 8-bit registers read as one little-endian
/// value. Only `bits` low bits are shown; every register is written whole.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterVector {
    name: &'static str,
    reg: u32,
    nregs: u8,
    bits: u8,
    flags: Flags,
}

impl RegisterVector {
    /// Minimum number of hex digits shown.
    pub const DIGITS: usize = 12;

    pub fn new(name: &'static str, reg: u32, nregs: u8, bits: u8, flags: Flags) -> Result<Self> {
        if !(1..=8).contains(&nregs) {
            return Err(Error::InvalidField(format!("{}: {} registers not in 1..=8", name, nregs)));
        }
        if bits == 0 || bits as u32 > nregs as u32 * 8 {
            return Err(Error::InvalidField(format!(
                "{}: {} bits do not fit {} registers", name, bits, nregs
            )));
        }
        if !(flags - Flags::ACTIVE_LOW).is_empty() {
            return Err(Error::InvalidField(format!("{}: only ACTIVE_LOW applies to a vector", name)));
        }

        Ok(RegisterVector { name, reg, nregs, bits, flags })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn reg(&self) -> u32 {
        self.reg
    }

    pub fn nregs(&self) -> usize {
        self.nregs as usize
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn mask(&self) -> u64 {
        if self.bits == 64 { u64::MAX } else { (1u64 << self.bits) - 1 }
    }

    fn register_byte(&self, b: u8) -> u8 {
        if self.flags.contains(Flags::ACTIVE_LOW) { !b } else { b }
    }

    pub fn read<B: RegisterBackend + ?Sized>(&self, backend: &B) -> Result<FieldValue> {
        let mut val = 0u64;
        for i in 0..self.nregs() {
            let b = backend.read(self.reg + i as u32, 1)? as u8;
            val |= (self.register_byte(b) as u64) << (i * 8);
        }

        let value = val & self.mask();
        log::debug!("read {} - reg: 0x{:x}, nregs: {}, value: 0x{:x}", self.name, self.reg, self.nregs, value);

        Ok(FieldValue::Vector { value, digits: Self::DIGITS })
    }

    /// Unsigned integer text in any base, no wider than the registers.
    pub fn parse(&self, input: &str) -> Result<u64> {
        let (negative, value) = parse_number(input).ok_or_else(|| {
            Error::invalid_argument(format!("{}: '{}' is not a number", self.name, input.trim_end()))
        })?;

        let width = self.nregs as u32 * 8;
        if negative || (width < 64 && value >> width != 0) {
            return Err(Error::invalid_argument(format!(
                "{}: {} does not fit {} registers", self.name, input.trim_end(), self.nregs
            )));
        }
        Ok(value)
    }

    pub fn write<B: RegisterBackend + ?Sized>(&self, backend: &B, input: &str) -> Result<()> {
        let value = self.parse(input)?;
        log::debug!("write {} - reg: 0x{:x}, nregs: {}, value: 0x{:x}", self.name, self.reg, self.nregs, value);

        for i in 0..self.nregs() {
            let b = self.register_byte((value >> (i * 8)) as u8);
            backend.write(self.reg + i as u32, 1, b as u32)?;
        }
        Ok(())
    }
}
