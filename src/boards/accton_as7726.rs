//! Accton AS7726-32X.
//!
//! Early boards put the board EEPROM at 0x56, where it collides with PHYs;
//! later ones moved it to 0x57. Both are created and only the one that
//! answers a read is kept.

use crate::boards::Board;
use crate::defs::I801_ADAPTER_NAME;
use crate::enums::MuxChip;
use crate::error::Result;
use crate::topology::{BusRef, DeviceKind, DeviceSpec, PlatformContext};

pub const BOARD_EEPROM_LABEL: &str = "board_eeprom";

const I801: BusRef = BusRef::Adapter(I801_ADAPTER_NAME);

const MUX0_BUS0: u32 = 10;
const MUX1_BUS0: u32 = 20;
const MUX2_BUS0: u32 = 30;
const MUX3_BUS0: u32 = 40;
const MUX4_BUS0: u32 = 50;
const MUX5_BUS0: u32 = 60;
const MUX6_BUS0: u32 = 70;

const fn ch(mux_bus0: u32, ch: u32) -> BusRef {
    BusRef::Virtual(mux_bus0 + ch)
}

pub const DEVICES_32X: &[DeviceSpec] = &[
    DeviceSpec::mux(I801, 0x77, MuxChip::Pca9548, MUX0_BUS0, true),
    DeviceSpec::eeprom(I801, 0x56, "24c02", BOARD_EEPROM_LABEL),
    DeviceSpec::eeprom(I801, 0x57, "24c02", BOARD_EEPROM_LABEL),
    DeviceSpec::mux(ch(MUX0_BUS0, 1), 0x71, MuxChip::Pca9548, MUX1_BUS0, true),
    DeviceSpec::mux(ch(MUX0_BUS0, 0), 0x72, MuxChip::Pca9548, MUX2_BUS0, true),
    DeviceSpec::mux(ch(MUX0_BUS0, 0), 0x73, MuxChip::Pca9548, MUX3_BUS0, true),
    DeviceSpec::mux(ch(MUX0_BUS0, 0), 0x74, MuxChip::Pca9548, MUX4_BUS0, true),
    DeviceSpec::mux(ch(MUX0_BUS0, 0), 0x75, MuxChip::Pca9548, MUX5_BUS0, true),
    DeviceSpec::mux(ch(MUX0_BUS0, 0), 0x76, MuxChip::Pca9548, MUX6_BUS0, true),
    DeviceSpec::eeprom(ch(MUX1_BUS0, 0), 0x50, "24c02", "psu2_eeprom"),
    DeviceSpec::psu(ch(MUX1_BUS0, 0), 0x58, "cpr4011"),
    DeviceSpec::eeprom(ch(MUX1_BUS0, 1), 0x53, "24c02", "psu1_eeprom"),
    DeviceSpec::psu(ch(MUX1_BUS0, 1), 0x5b, "cpr4011"),
    DeviceSpec::sensor(ch(MUX1_BUS0, 6), 0x48, "lm75"),
    DeviceSpec::sensor(ch(MUX1_BUS0, 6), 0x49, "lm75"),
    DeviceSpec::sensor(ch(MUX1_BUS0, 6), 0x4a, "lm75"),
    DeviceSpec::sensor(ch(MUX1_BUS0, 6), 0x4b, "lm75"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 0), "port9"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 1), "port10"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 2), "port11"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 3), "port12"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 4), "port1"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 5), "port2"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 6), "port3"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 7), "port4"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 0), "port6"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 1), "port5"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 2), "port8"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 3), "port7"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 4), "port13"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 5), "port14"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 6), "port15"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 7), "port16"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 0), "port17"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 1), "port18"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 2), "port19"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 3), "port20"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 4), "port25"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 5), "port26"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 6), "port27"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 7), "port28"),
    DeviceSpec::qsfp(ch(MUX5_BUS0, 0), "port29"),
    DeviceSpec::qsfp(ch(MUX5_BUS0, 1), "port30"),
    DeviceSpec::qsfp(ch(MUX5_BUS0, 2), "port31"),
    DeviceSpec::qsfp(ch(MUX5_BUS0, 3), "port32"),
    DeviceSpec::qsfp(ch(MUX5_BUS0, 4), "port21"),
    DeviceSpec::qsfp(ch(MUX5_BUS0, 5), "port22"),
    DeviceSpec::qsfp(ch(MUX5_BUS0, 6), "port23"),
    DeviceSpec::qsfp(ch(MUX5_BUS0, 7), "port24"),
    DeviceSpec::cpld(ch(MUX6_BUS0, 2), 0x60, "cpld-1"),
    DeviceSpec::cpld(ch(MUX6_BUS0, 3), 0x62, "cpld-2"),
    DeviceSpec::cpld(ch(MUX6_BUS0, 4), 0x64, "cpld-3"),
    DeviceSpec::cpld(ch(MUX1_BUS0, 5), 0x66, "fan-cpld"),
];

/// Keep the first board EEPROM candidate, in table order, that answers a
/// read of byte 0 and delete the rest. Returns the address kept.
pub fn retain_board_eeprom(ctx: &mut PlatformContext<'_>) -> Result<Option<u16>> {
    let mut found: Option<(u32, u16)> = None;
    let mut discard = Vec::new();

    for client in ctx.clients() {
        let DeviceKind::Eeprom(cfg) = client.kind else {
            continue;
        };
        if cfg.label != BOARD_EEPROM_LABEL {
            continue;
        }

        if found.is_none() && client.check_present().is_ok() {
            log::info!("Board EEPROM discovered at: 0x{:02x}", client.addr);
            found = Some((client.bus, client.addr));
        } else {
            discard.push((client.bus, client.addr));
        }
    }

    for (bus, addr) in discard {
        log::debug!("Removing board EEPROM candidate at i2c-{} 0x{:02x}", bus, addr);
        ctx.release(bus, addr)?;
    }

    if found.is_none() {
        log::warn!("No board EEPROM candidate responded");
    }

    Ok(found.map(|(_, addr)| addr))
}

fn fixup(ctx: &mut PlatformContext<'_>) -> Result<()> {
    retain_board_eeprom(ctx).map(|_| ())
}

pub const AS7726_32X: Board = Board {
    name: "accton_as7726_32x",
    devices: DEVICES_32X,
    groups: &[],
    fixup: Some(fixup),
};
