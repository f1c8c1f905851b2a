/// Mask covering the low `width` bits.
pub fn field_mask(width: u8) -> u32 {
    assert!((1..=32).contains(&width), "width must be 1-32");
    ((1u64 << width) - 1) as u32
}

/// Number of 8-bit registers a field at `shift` with `width` bits spans.
pub fn field_nregs(shift: u8, width: u8) -> usize {
    (shift as usize + width as usize + 7) / 8
}

pub fn get_field(raw: u32, shift: u8, width: u8) -> u32 {
    assert!(shift as u32 + width as u32 <= 32, "field exceeds 32 bits");

    let mask = field_mask(width);
    let val = ((raw as u64) >> shift) as u32 & mask;

    log::trace!("get_field - raw: 0x{:08x}, shift: {}, width: {}, mask: 0x{:x}, val: 0x{:x}",
        raw,
        shift,
        width,
        mask,
        val
    );

    val
}

/// Place `val` at `shift` inside `raw`, leaving every bit outside the field alone.
pub fn put_field(raw: u32, shift: u8, width: u8, val: u32) -> u32 {
    assert!(shift as u32 + width as u32 <= 32, "field exceeds 32 bits");

    let mask = field_mask(width);
    let shifted_mask = ((mask as u64) << shift) as u32;
    let new_val = (raw & !shifted_mask) | ((((val & mask) as u64) << shift) as u32);

    log::trace!("put_field - raw: 0x{:08x}, shift: {}, width: {}, val: 0x{:x}, new_val: 0x{:08x}",
        raw,
        shift,
        width,
        val,
        new_val
    );

    new_val
}

/// Byte `i` contributes bits `[8*i, 8*i+8)`.
pub fn assemble_le(bytes: &[u8]) -> u32 {
    assert!(bytes.len() <= 4, "at most 4 registers");

    bytes
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, &b)| acc | (b as u32) << (i * 8))
}

pub fn split_le(val: u32, nregs: usize) -> Vec<u8> {
    assert!(nregs <= 4, "at most 4 registers");

    (0..nregs).map(|i| (val >> (i * 8)) as u8).collect()
}
