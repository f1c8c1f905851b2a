//! Accton AS5835-54T.
//!
//! Two host adapters; everything but the board EEPROM and the CPU CPLD
//! hangs off the pca9548 at 0x77 on the iSMT bus.

use crate::attr::Attribute;
use crate::bitfield::Flags;
use crate::boards::{Board, GroupSpec};
use crate::defs::*;
use crate::enums::MuxChip;
use crate::error::Result;
use crate::mk_bf;
use crate::topology::{BusRef, DeviceSpec};

pub const CPUCPLD_NAME: &str = "as5835_cpucpld";
pub const CPLD1_NAME: &str = "as5835_cpld1";
pub const CPLD2_NAME: &str = "as5835_cpld2";
pub const CPLD3_NAME: &str = "as5835_cpld3";
pub const CPLD4_NAME: &str = "as5835_cpld4";

pub const CPLD1_BOARD_ID_REG: u32 = 0x00;
pub const CPLD1_VERSION_REG: u32 = 0x01;
pub const CPLD1_PSU_STATUS_REG: u32 = 0x02;
pub const CPLD1_VID_STATUS_REG: u32 = 0x03;
pub const CPLD1_RESET_CONTROL_REG: u32 = 0x04;
pub const CPLD1_RESET_XGPHY_12_9_REG: u32 = 0x05;
pub const CPLD1_RESET_XGPHY_8_1_REG: u32 = 0x06;
pub const CPLD1_INTERRUPT_STATUS_REG: u32 = 0x07;
pub const CPLD1_SYSTEM_LED_REG: u32 = 0x0a;
pub const CPLD1_PSU_LED_REG: u32 = 0x0b;
pub const CPLD1_OTHER_1_REG: u32 = 0x0e;
pub const CPLD1_OTHER_2_REG: u32 = 0x15;

pub const CPLD2_VERSION_REG: u32 = 0x01;
pub const CPLD2_SFP_PRESENT_REG: u32 = 0x08;
pub const CPLD2_SFP_TX_FAULT_REG: u32 = 0x0d;
pub const CPLD2_SFP_TX_DISABLE_REG: u32 = 0x12;
pub const CPLD2_SFP_RX_LOS_REG: u32 = 0x17;
const CPLD2_SFP_REGS: u8 = 5;
const CPLD2_SFP_PORTS: u8 = 38;

pub const CPLD3_VERSION_REG: u32 = 0x01;
pub const CPLD3_SFP_PRESENT_REG: u32 = 0x06;
pub const CPLD3_SFP_TX_FAULT_REG: u32 = 0x09;
pub const CPLD3_SFP_TX_DISABLE_REG: u32 = 0x0c;
pub const CPLD3_SFP_RX_LOS_REG: u32 = 0x0f;
pub const CPLD3_QSFP_INT_REG: u32 = 0x12;
pub const CPLD3_QSFP_MODULE_INT_REG: u32 = 0x13;
pub const CPLD3_QSFP_PRESENT_REG: u32 = 0x14;
pub const CPLD3_QSFP_MOD_RST_REG: u32 = 0x15;
pub const CPLD3_QSFP_LPMODE_REG: u32 = 0x16;
const CPLD3_SFP_REGS: u8 = 2;
const CPLD3_SFP_PORTS: u8 = 10;

const LED_AUTODETECT: &str = "autodetect";

const LED_LOCATOR_VALUES: &[&str] = &[LED_RED, LED_OFF, LED_RED_BLINKING, LED_RED_BLINKING];
const LED_DIAG_VALUES: &[&str] = &[LED_AMBER, LED_RED, LED_GREEN, LED_OFF];
const LED_FAN_VALUES: &[&str] = &[LED_AUTODETECT, LED_AMBER, LED_GREEN, LED_OFF];
const LED_PSU_VALUES: &[&str] = &[LED_AUTODETECT, LED_AMBER, LED_GREEN, LED_OFF];

pub fn cpld1_attributes() -> Result<Vec<Attribute>> {
    let none = Flags::empty();
    let low = Flags::ACTIVE_LOW;

    Ok(vec![
        mk_bf!(ro, "board_id", CPLD1_BOARD_ID_REG, 0, 4, None, none),
        mk_bf!(ro, "cpld_version", CPLD1_VERSION_REG, 0, 4, None, none),
        mk_bf!(bt ro, "psu_pwr2_ac_ok", CPLD1_PSU_STATUS_REG, 6, None, none),
        mk_bf!(bt ro, "psu_pwr2_dc_ok", CPLD1_PSU_STATUS_REG, 5, None, none),
        mk_bf!(bt ro, "psu_pwr2_present", CPLD1_PSU_STATUS_REG, 4, None, low),
        mk_bf!(bt ro, "psu_pwr1_ac_ok", CPLD1_PSU_STATUS_REG, 2, None, none),
        mk_bf!(bt ro, "psu_pwr1_dc_ok", CPLD1_PSU_STATUS_REG, 1, None, none),
        mk_bf!(bt ro, "psu_pwr1_present", CPLD1_PSU_STATUS_REG, 0, None, low),
        mk_bf!(rg ro, "svid_status", CPLD1_VID_STATUS_REG, None, none),
        mk_bf!(bt rw, "reset_88e1512_phy", CPLD1_RESET_CONTROL_REG, 5, None, low),
        mk_bf!(bt rw, "reset_pcie", CPLD1_RESET_CONTROL_REG, 4, None, low),
        mk_bf!(bt rw, "reset_mac", CPLD1_RESET_CONTROL_REG, 3, None, low),
        mk_bf!(bt rw, "reset_i210_phy", CPLD1_RESET_CONTROL_REG, 2, None, low),
        mk_bf!(bt rw, "reset_pca9548", CPLD1_RESET_CONTROL_REG, 1, None, low),
        mk_bf!(bt rw, "reset_phy12", CPLD1_RESET_XGPHY_12_9_REG, 3, None, low),
        mk_bf!(bt rw, "reset_phy11", CPLD1_RESET_XGPHY_12_9_REG, 2, None, low),
        mk_bf!(bt rw, "reset_phy10", CPLD1_RESET_XGPHY_12_9_REG, 1, None, low),
        mk_bf!(bt rw, "reset_phy9", CPLD1_RESET_XGPHY_12_9_REG, 0, None, low),
        mk_bf!(bt rw, "reset_phy8", CPLD1_RESET_XGPHY_8_1_REG, 7, None, low),
        mk_bf!(bt rw, "reset_phy7", CPLD1_RESET_XGPHY_8_1_REG, 6, None, low),
        mk_bf!(bt rw, "reset_phy6", CPLD1_RESET_XGPHY_8_1_REG, 5, None, low),
        mk_bf!(bt rw, "reset_phy5", CPLD1_RESET_XGPHY_8_1_REG, 4, None, low),
        mk_bf!(bt rw, "reset_phy4", CPLD1_RESET_XGPHY_8_1_REG, 3, None, low),
        mk_bf!(bt rw, "reset_phy3", CPLD1_RESET_XGPHY_8_1_REG, 2, None, low),
        mk_bf!(bt rw, "reset_phy2", CPLD1_RESET_XGPHY_8_1_REG, 1, None, low),
        mk_bf!(bt rw, "reset_phy1", CPLD1_RESET_XGPHY_8_1_REG, 0, None, low),
        mk_bf!(bt ro, "lm75_int_cpu", CPLD1_INTERRUPT_STATUS_REG, 7, None, low),
        mk_bf!(bt ro, "mac_int", CPLD1_INTERRUPT_STATUS_REG, 5, None, low),
        mk_bf!(bt ro, "cpld23_int", CPLD1_INTERRUPT_STATUS_REG, 4, None, low),
        mk_bf!(bt ro, "88e1512_int", CPLD1_INTERRUPT_STATUS_REG, 3, None, low),
        mk_bf!(bt ro, "lm75_int_ch3", CPLD1_INTERRUPT_STATUS_REG, 2, None, low),
        mk_bf!(bt ro, "lm75_int_ch2", CPLD1_INTERRUPT_STATUS_REG, 1, None, low),
        mk_bf!(bt ro, "lm75_int_ch1", CPLD1_INTERRUPT_STATUS_REG, 0, None, low),
        mk_bf!(rw, "led_locator", CPLD1_SYSTEM_LED_REG, 4, 2, Some(LED_LOCATOR_VALUES), none),
        mk_bf!(rw, "led_diag", CPLD1_SYSTEM_LED_REG, 2, 2, Some(LED_DIAG_VALUES), none),
        mk_bf!(rw, "led_fan", CPLD1_SYSTEM_LED_REG, 0, 2, Some(LED_FAN_VALUES), none),
        mk_bf!(rw, "led_psu2", CPLD1_PSU_LED_REG, 2, 2, Some(LED_PSU_VALUES), none),
        mk_bf!(rw, "led_psu1", CPLD1_PSU_LED_REG, 0, 2, Some(LED_PSU_VALUES), none),
        mk_bf!(bt ro, "mdc_mdio_sel1", CPLD1_OTHER_1_REG, 3, None, low),
        mk_bf!(bt ro, "mdc_mdio_sel0", CPLD1_OTHER_1_REG, 2, None, low),
        mk_bf!(bt ro, "cpld_select", CPLD1_OTHER_1_REG, 0, None, low),
        mk_bf!(bt ro, "pcie_wake", CPLD1_OTHER_2_REG, 1, None, low),
        mk_bf!(bt ro, "pcie_intr", CPLD1_OTHER_2_REG, 0, None, low),
    ])
}

/// SFP ports 1-38. Presence is active low in hardware.
pub fn cpld2_attributes() -> Result<Vec<Attribute>> {
    let none = Flags::empty();

    Ok(vec![
        mk_bf!(ro, "cpld_version", CPLD2_VERSION_REG, 0, 4, None, none),
        mk_bf!(vec ro, "sfp_38_1_present", CPLD2_SFP_PRESENT_REG, CPLD2_SFP_REGS, CPLD2_SFP_PORTS, Flags::ACTIVE_LOW),
        mk_bf!(vec ro, "sfp_38_1_tx_fault", CPLD2_SFP_TX_FAULT_REG, CPLD2_SFP_REGS, CPLD2_SFP_PORTS, none),
        mk_bf!(vec rw, "sfp_38_1_tx_disable", CPLD2_SFP_TX_DISABLE_REG, CPLD2_SFP_REGS, CPLD2_SFP_PORTS, none),
        mk_bf!(vec ro, "sfp_38_1_rx_los", CPLD2_SFP_RX_LOS_REG, CPLD2_SFP_REGS, CPLD2_SFP_PORTS, none),
    ])
}

/// SFP ports 39-48 and the six QSFP ports.
pub fn cpld3_attributes() -> Result<Vec<Attribute>> {
    let none = Flags::empty();

    Ok(vec![
        mk_bf!(ro, "cpld_version", CPLD3_VERSION_REG, 0, 4, None, none),
        mk_bf!(vec ro, "sfp_48_39_present", CPLD3_SFP_PRESENT_REG, CPLD3_SFP_REGS, CPLD3_SFP_PORTS, Flags::ACTIVE_LOW),
        mk_bf!(vec ro, "sfp_48_39_tx_fault", CPLD3_SFP_TX_FAULT_REG, CPLD3_SFP_REGS, CPLD3_SFP_PORTS, none),
        mk_bf!(vec rw, "sfp_48_39_tx_disable", CPLD3_SFP_TX_DISABLE_REG, CPLD3_SFP_REGS, CPLD3_SFP_PORTS, none),
        mk_bf!(vec ro, "sfp_48_39_rx_los", CPLD3_SFP_RX_LOS_REG, CPLD3_SFP_REGS, CPLD3_SFP_PORTS, none),
        mk_bf!(ro, "qsfp_54_49_interrupt", CPLD3_QSFP_INT_REG, 0, 6, None, none),
        mk_bf!(ro, "qsfp_54_49_module_interrupt", CPLD3_QSFP_MODULE_INT_REG, 0, 6, None, none),
        mk_bf!(ro, "qsfp_54_49_present", CPLD3_QSFP_PRESENT_REG, 0, 6, None, none),
        mk_bf!(rw, "qsfp_54_49_reset", CPLD3_QSFP_MOD_RST_REG, 0, 6, None, none),
        mk_bf!(rw, "qsfp_54_49_lpmode", CPLD3_QSFP_LPMODE_REG, 0, 6, None, none),
    ])
}

const ISMT: BusRef = BusRef::Adapter(ISMT_ADAPTER_NAME);

// virtual bus blocks handed to each mux
const MUX1_BUS0: u32 = 10;
const MUX2_BUS0: u32 = 18;
const MUX3_BUS0: u32 = 26;
const MUX4_BUS0: u32 = 34;

const fn mux1(ch: u32) -> BusRef {
    BusRef::Virtual(MUX1_BUS0 + ch)
}

const fn mux3(ch: u32) -> BusRef {
    BusRef::Virtual(MUX3_BUS0 + ch)
}

const fn mux4(ch: u32) -> BusRef {
    BusRef::Virtual(MUX4_BUS0 + ch)
}

pub const DEVICES_54T: &[DeviceSpec] = &[
    DeviceSpec::eeprom(ISMT, 0x57, "24c02", "board_eeprom"),
    DeviceSpec::cpld(ISMT, 0x65, CPUCPLD_NAME),
    DeviceSpec::mux(ISMT, 0x77, MuxChip::Pca9548, MUX1_BUS0, true),
    DeviceSpec::mux(mux1(0), 0x70, MuxChip::Pca9548, MUX2_BUS0, true),
    DeviceSpec::mux(mux1(0), 0x72, MuxChip::Pca9548, MUX3_BUS0, true),
    DeviceSpec::qsfp(mux3(2), "port49"),
    DeviceSpec::qsfp(mux3(3), "port50"),
    DeviceSpec::qsfp(mux3(0), "port51"),
    DeviceSpec::qsfp(mux3(4), "port52"),
    DeviceSpec::qsfp(mux3(5), "port53"),
    DeviceSpec::qsfp(mux3(1), "port54"),
    DeviceSpec::mux(mux1(0), 0x71, MuxChip::Pca9545, MUX4_BUS0, true),
    DeviceSpec::sensor(mux4(0), 0x4b, "tmp75"),
    DeviceSpec::sensor(mux4(1), 0x4c, "tmp75"),
    DeviceSpec::sensor(mux4(2), 0x49, "tmp75"),
    DeviceSpec::sensor(mux4(3), 0x4a, "tmp75"),
    DeviceSpec::cpld(mux1(1), 0x60, CPLD1_NAME),
    DeviceSpec::cpld(mux1(1), 0x61, CPLD2_NAME),
    DeviceSpec::cpld(mux1(1), 0x62, CPLD3_NAME),
    DeviceSpec::cpld(mux1(1), 0x63, CPLD4_NAME),
];

pub const AS5835_54T: Board = Board {
    name: "accton_as5835_54t",
    devices: DEVICES_54T,
    groups: &[
        GroupSpec {
            name: "cpld1",
            device: CPLD1_NAME,
            attributes: cpld1_attributes,
        },
        GroupSpec {
            name: "cpld2",
            device: CPLD2_NAME,
            attributes: cpld2_attributes,
        },
        GroupSpec {
            name: "cpld3",
            device: CPLD3_NAME,
            attributes: cpld3_attributes,
        },
    ],
    fixup: None,
};
