//! Accton Wedge100-32X.
//!
//! Everything hangs off a CP2112 USB bridge. Four pca9548s lead to the
//! 32 QSFP28 cages, which all answer at 0x50, so every mux must disconnect
//! its channels when idle. The fifth leads to six pca9535 expanders for
//! the port control and status lines and to the board EEPROM.

use crate::boards::Board;
use crate::defs::CP2112_ADAPTER_NAME;
use crate::enums::MuxChip;
use crate::topology::{BusRef, DeviceSpec};

pub const CPLD_NAME: &str = "act_wedge100_cpld";

const CP2112: BusRef = BusRef::Adapter(CP2112_ADAPTER_NAME);

const MUX1_BUS0: u32 = 10;
const MUX2_BUS0: u32 = 20;
const MUX3_BUS0: u32 = 30;
const MUX4_BUS0: u32 = 40;
const MUX5_BUS0: u32 = 50;

const fn ch(mux_bus0: u32, ch: u32) -> BusRef {
    BusRef::Virtual(mux_bus0 + ch)
}

// cage pairs are wired swapped on every expander
pub const GPIO1_LINES: &[&str] = &[
    "qsfp2_lp_mode", "qsfp1_lp_mode", "qsfp4_lp_mode", "qsfp3_lp_mode",
    "qsfp6_lp_mode", "qsfp5_lp_mode", "qsfp8_lp_mode", "qsfp7_lp_mode",
    "qsfp10_lp_mode", "qsfp9_lp_mode", "qsfp12_lp_mode", "qsfp11_lp_mode",
    "qsfp14_lp_mode", "qsfp13_lp_mode", "qsfp16_lp_mode", "qsfp15_lp_mode",
];

pub const GPIO2_LINES: &[&str] = &[
    "qsfp18_lp_mode", "qsfp17_lp_mode", "qsfp20_lp_mode", "qsfp19_lp_mode",
    "qsfp22_lp_mode", "qsfp21_lp_mode", "qsfp24_lp_mode", "qsfp23_lp_mode",
    "qsfp26_lp_mode", "qsfp25_lp_mode", "qsfp28_lp_mode", "qsfp27_lp_mode",
    "qsfp30_lp_mode", "qsfp29_lp_mode", "qsfp32_lp_mode", "qsfp31_lp_mode",
];

pub const GPIO3_LINES: &[&str] = &[
    "qsfp2_present", "qsfp1_present", "qsfp4_present", "qsfp3_present",
    "qsfp6_present", "qsfp5_present", "qsfp8_present", "qsfp7_present",
    "qsfp10_present", "qsfp9_present", "qsfp12_present", "qsfp11_present",
    "qsfp14_present", "qsfp13_present", "qsfp16_present", "qsfp15_present",
];

pub const GPIO4_LINES: &[&str] = &[
    "qsfp18_present", "qsfp17_present", "qsfp20_present", "qsfp19_present",
    "qsfp22_present", "qsfp21_present", "qsfp24_present", "qsfp23_present",
    "qsfp26_present", "qsfp25_present", "qsfp28_present", "qsfp27_present",
    "qsfp30_present", "qsfp29_present", "qsfp32_present", "qsfp31_present",
];

pub const GPIO5_LINES: &[&str] = &[
    "qsfp2_interrupt", "qsfp1_interrupt", "qsfp4_interrupt", "qsfp3_interrupt",
    "qsfp6_interrupt", "qsfp5_interrupt", "qsfp8_interrupt", "qsfp7_interrupt",
    "qsfp10_interrupt", "qsfp9_interrupt", "qsfp12_interrupt", "qsfp11_interrupt",
    "qsfp14_interrupt", "qsfp13_interrupt", "qsfp16_interrupt", "qsfp15_interrupt",
];

pub const GPIO6_LINES: &[&str] = &[
    "qsfp18_interrupt", "qsfp17_interrupt", "qsfp20_interrupt", "qsfp19_interrupt",
    "qsfp22_interrupt", "qsfp21_interrupt", "qsfp24_interrupt", "qsfp23_interrupt",
    "qsfp26_interrupt", "qsfp25_interrupt", "qsfp28_interrupt", "qsfp27_interrupt",
    "qsfp30_interrupt", "qsfp29_interrupt", "qsfp32_interrupt", "qsfp31_interrupt",
];

pub const DEVICES_32X: &[DeviceSpec] = &[
    DeviceSpec::mux(CP2112, 0x70, MuxChip::Pca9548, MUX1_BUS0, true),
    DeviceSpec::mux(CP2112, 0x71, MuxChip::Pca9548, MUX2_BUS0, true),
    DeviceSpec::mux(CP2112, 0x72, MuxChip::Pca9548, MUX3_BUS0, true),
    DeviceSpec::mux(CP2112, 0x73, MuxChip::Pca9548, MUX4_BUS0, true),
    DeviceSpec::mux(CP2112, 0x74, MuxChip::Pca9548, MUX5_BUS0, true),
    DeviceSpec::cpld(CP2112, 0x32, CPLD_NAME),
    DeviceSpec::gpio(ch(MUX5_BUS0, 0), 0x20, "pca9535", 1, GPIO1_LINES),
    DeviceSpec::gpio(ch(MUX5_BUS0, 1), 0x21, "pca9535", 17, GPIO2_LINES),
    DeviceSpec::gpio(ch(MUX5_BUS0, 2), 0x22, "pca9535", 101, GPIO3_LINES),
    DeviceSpec::gpio(ch(MUX5_BUS0, 3), 0x23, "pca9535", 117, GPIO4_LINES),
    DeviceSpec::gpio(ch(MUX5_BUS0, 4), 0x24, "pca9535", 201, GPIO5_LINES),
    DeviceSpec::gpio(ch(MUX5_BUS0, 5), 0x25, "pca9535", 217, GPIO6_LINES),
    DeviceSpec::eeprom(ch(MUX5_BUS0, 6), 0x50, "24c64", "board_eeprom"),
    DeviceSpec::qsfp(ch(MUX1_BUS0, 1), "port1"),
    DeviceSpec::qsfp(ch(MUX1_BUS0, 0), "port2"),
    DeviceSpec::qsfp(ch(MUX1_BUS0, 3), "port3"),
    DeviceSpec::qsfp(ch(MUX1_BUS0, 2), "port4"),
    DeviceSpec::qsfp(ch(MUX1_BUS0, 5), "port5"),
    DeviceSpec::qsfp(ch(MUX1_BUS0, 4), "port6"),
    DeviceSpec::qsfp(ch(MUX1_BUS0, 7), "port7"),
    DeviceSpec::qsfp(ch(MUX1_BUS0, 6), "port8"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 1), "port9"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 0), "port10"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 3), "port11"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 2), "port12"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 5), "port13"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 4), "port14"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 7), "port15"),
    DeviceSpec::qsfp(ch(MUX2_BUS0, 6), "port16"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 1), "port17"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 0), "port18"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 3), "port19"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 2), "port20"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 5), "port21"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 4), "port22"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 7), "port23"),
    DeviceSpec::qsfp(ch(MUX3_BUS0, 6), "port24"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 1), "port25"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 0), "port26"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 3), "port27"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 2), "port28"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 5), "port29"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 4), "port30"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 7), "port31"),
    DeviceSpec::qsfp(ch(MUX4_BUS0, 6), "port32"),
];

pub const WEDGE100_32X: Board = Board {
    name: "accton_wedge100_32x",
    devices: DEVICES_32X,
    groups: &[],
    fixup: None,
};
