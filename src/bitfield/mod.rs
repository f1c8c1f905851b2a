//! Bit-field views onto banks of 8-bit registers.
//!
//! A field names `width` bits starting `shift` bits above its base
//! register. Enough consecutive registers are accessed to cover
//! `shift + width` bits, little endian, so a field may span up to four
//! registers. Values are shown in hex, in decimal, or through a table of
//! names, and may be complemented (active-low) or signed.

use std::fmt;

use bitflags::bitflags;

use crate::backend::RegisterBackend;
use crate::defs::LED_COLOR_NAME_SIZE;
use crate::error::{Error, Result};

pub mod helpers;
pub mod vector;

use helpers::{field_mask, field_nregs, get_field, put_field};
pub use vector::RegisterVector;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        /// Complement the value, presenting an active-low signal as active-high.
        const ACTIVE_LOW = 0x01;
        /// Show the value in decimal instead of hex.
        const DECIMAL = 0x02;
        /// The value is two's complement within the field width.
        const SIGNED = 0x04;
    }
}

/// What a field read produces.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Symbol(&'static str),
    Decimal(i64),
    Hex { value: i64, digits: usize },
    /// A multi-register status vector, always unsigned.
    Vector { value: u64, digits: usize },
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Symbol(s) => write!(f, "{}", s),
            FieldValue::Decimal(v) => write!(f, "{}", v),
            FieldValue::Hex { value, digits } if *value < 0 => {
                write!(f, "-0x{:0width$x}", value.unsigned_abs(), width = *digits)
            }
            FieldValue::Hex { value, digits } => {
                write!(f, "0x{:0width$x}", value, width = *digits)
            }
            FieldValue::Vector { value, digits } => {
                write!(f, "0x{:0width$x}", value, width = *digits)
            }
        }
    }
}

/// Only built through [`RegisterField::new`], so a symbol table always
/// covers every value the field can hold.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterField {
    name: &'static str,
    reg: u32,
    shift: u8,
    width: u8,
    symbols: Option<&'static [&'static str]>,
    flags: Flags,
}

impl RegisterField {
    pub fn new(
        name: &'static str,
        reg: u32,
        shift: u8,
        width: u8,
        symbols: Option<&'static [&'static str]>,
        flags: Flags,
    ) -> Result<Self> {
        if !(1..=32).contains(&width) {
            return Err(Error::InvalidField(format!("{}: width {} not in 1..=32", name, width)));
        }
        if shift as u32 + width as u32 > 32 {
            return Err(Error::InvalidField(format!(
                "{}: shift {} + width {} exceeds 32 bits", name, shift, width
            )));
        }
        if let Some(values) = symbols {
            if (values.len() as u64) < (1u64 << width) {
                return Err(Error::InvalidField(format!(
                    "{}: {} names cannot cover a {}-bit field", name, values.len(), width
                )));
            }
            if flags.contains(Flags::SIGNED) {
                return Err(Error::InvalidField(format!(
                    "{}: a named field cannot be signed", name
                )));
            }
        }

        Ok(RegisterField { name, reg, shift, width, symbols, flags })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn reg(&self) -> u32 {
        self.reg
    }

    pub fn shift(&self) -> u8 {
        self.shift
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn symbols(&self) -> Option<&'static [&'static str]> {
        self.symbols
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn nregs(&self) -> usize {
        field_nregs(self.shift, self.width)
    }

    pub fn mask(&self) -> u32 {
        field_mask(self.width)
    }

    /// True when a write has to preserve neighbouring bits.
    pub fn is_partial(&self) -> bool {
        self.shift != 0 || self.width % 8 != 0
    }

    /// Decode the raw little-endian register window this field lives in.
    pub fn decode(&self, raw: u32) -> FieldValue {
        let mask = self.mask();
        let mut value = get_field(raw, self.shift, self.width);

        if self.flags.contains(Flags::ACTIVE_LOW) {
            value ^= mask;
        }

        if let Some(values) = self.symbols {
            return FieldValue::Symbol(values[value as usize]);
        }

        let sign_bit = mask ^ (mask >> 1);
        let display = if self.flags.contains(Flags::SIGNED) && value & sign_bit != 0 {
            -((value ^ mask) as i64 + 1)
        } else {
            value as i64
        };

        if self.width < 2 || self.flags.contains(Flags::DECIMAL) {
            FieldValue::Decimal(display)
        } else {
            FieldValue::Hex { value: display, digits: (self.width as usize + 3) / 4 }
        }
    }

    pub fn read<B: RegisterBackend + ?Sized>(&self, backend: &B) -> Result<FieldValue> {
        let raw = backend.read(self.reg, self.nregs())?;
        let value = self.decode(raw);

        log::debug!("read {} - reg: 0x{:x}, nregs: {}, raw: 0x{:x}, value: {}",
            self.name,
            self.reg,
            self.nregs(),
            raw,
            value
        );

        Ok(value)
    }

    /// Turn user text into the field's raw value, before complementing.
    pub fn parse(&self, input: &str) -> Result<u32> {
        let mask = self.mask();

        if let Some(values) = self.symbols {
            let token = input.split_whitespace().next().ok_or_else(|| {
                Error::invalid_argument(format!("{}: empty value", self.name))
            })?;
            if token.len() >= LED_COLOR_NAME_SIZE {
                return Err(Error::invalid_argument(format!("{}: '{}' is too long", self.name, token)));
            }

            return values
                .iter()
                .take(mask as usize + 1)
                .position(|v| *v == token)
                .map(|i| i as u32)
                .ok_or_else(|| Error::invalid_argument(format!("{}: unknown value '{}'", self.name, token)));
        }

        let (negative, magnitude) = parse_number(input)
            .ok_or_else(|| Error::invalid_argument(format!("{}: '{}' is not a number", self.name, input.trim_end())))?;

        if self.flags.contains(Flags::SIGNED) {
            let max = (mask >> 1) as i128;
            let min = -((mask ^ (mask >> 1)) as i128);
            let v = if negative { -(magnitude as i128) } else { magnitude as i128 };
            if v < min || v > max {
                return Err(Error::invalid_argument(format!(
                    "{}: {} outside [{}, {}]", self.name, v, min, max
                )));
            }
            Ok((v as i64 as u64 as u32) & mask)
        } else {
            if negative || magnitude > mask as u64 {
                return Err(Error::invalid_argument(format!(
                    "{}: {} outside [0, {}]", self.name, input.trim_end(), mask
                )));
            }
            Ok(magnitude as u32)
        }
    }

    pub fn write<B: RegisterBackend + ?Sized>(&self, backend: &B, input: &str) -> Result<()> {
        let mut newval = self.parse(input)?;

        if self.flags.contains(Flags::ACTIVE_LOW) {
            newval ^= self.mask();
        }

        let nregs = self.nregs();
        let combined = if self.is_partial() {
            let old = backend.read(self.reg, nregs)?;
            put_field(old, self.shift, self.width, newval)
        } else {
            put_field(0, self.shift, self.width, newval)
        };

        log::debug!("write {} - reg: 0x{:x}, nregs: {}, field: 0x{:x}, combined: 0x{:x}",
            self.name,
            self.reg,
            nregs,
            newval,
            combined
        );

        backend.write(self.reg, nregs, combined)
    }
}

/// Integer text in any base: `0x` hex, leading `0` octal, otherwise decimal.
/// One trailing newline is allowed, no other whitespace. Returns the sign
/// and the magnitude.
pub(crate) fn parse_number(input: &str) -> Option<(bool, u64)> {
    let s = input.strip_suffix('\n').unwrap_or(input);
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    if body.is_empty() || body.starts_with(['+', '-']) {
        return None;
    }

    u64::from_str_radix(body, radix).ok().map(|m| (negative, m))
}

/// Build an [`Attribute`](crate::attr::Attribute) inside a function returning
/// [`Result`](crate::error::Result).
///
/// The plain `ro`/`rw` forms take an explicit shift and width, `bt` is a
/// single bit, `rg` is a whole 8-bit register and `vec` is a
/// [`RegisterVector`] over consecutive registers.
#[macro_export]
macro_rules! mk_bf {
    (ro, $name:literal, $reg:expr, $shift:expr, $width:expr, $values:expr, $flags:expr) => {
        $crate::attr::Attribute::new(
            $crate::bitfield::RegisterField::new($name, $reg, $shift, $width, $values, $flags)?,
            $crate::enums::AttrMode::ReadOnly,
        )
    };
    (rw, $name:literal, $reg:expr, $shift:expr, $width:expr, $values:expr, $flags:expr) => {
        $crate::attr::Attribute::new(
            $crate::bitfield::RegisterField::new($name, $reg, $shift, $width, $values, $flags)?,
            $crate::enums::AttrMode::ReadWrite,
        )
    };
    (bt $mode:ident, $name:literal, $reg:expr, $bit:expr, $values:expr, $flags:expr) => {
        $crate::mk_bf!($mode, $name, $reg, $bit, 1, $values, $flags)
    };
    (rg $mode:ident, $name:literal, $reg:expr, $values:expr, $flags:expr) => {
        $crate::mk_bf!($mode, $name, $reg, 0, 8, $values, $flags)
    };
    (vec ro, $name:literal, $reg:expr, $nregs:expr, $bits:expr, $flags:expr) => {
        $crate::attr::Attribute::vector(
            $crate::bitfield::RegisterVector::new($name, $reg, $nregs, $bits, $flags)?,
            $crate::enums::AttrMode::ReadOnly,
        )
    };
    (vec rw, $name:literal, $reg:expr, $nregs:expr, $bits:expr, $flags:expr) => {
        $crate::attr::Attribute::vector(
            $crate::bitfield::RegisterVector::new($name, $reg, $nregs, $bits, $flags)?,
            $crate::enums::AttrMode::ReadWrite,
        )
    };
}
