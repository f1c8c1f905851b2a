//! Strings shared by every board so the attribute surface looks the same
//! whichever switch it runs on.

pub const PLATFORM_OK: &str = "ok";
pub const PLATFORM_INSTALLED: &str = "installed";
pub const PLATFORM_NOT_INSTALLED: &str = "not_installed";

pub const LED_ON: &str = "on";
pub const LED_OFF: &str = "off";
pub const LED_RED: &str = "red";
pub const LED_RED_BLINKING: &str = "red_blinking";
pub const LED_RED_SLOW_BLINKING: &str = "red_slow_blinking";
pub const LED_GREEN: &str = "green";
pub const LED_GREEN_BLINKING: &str = "green_blinking";
pub const LED_GREEN_SLOW_BLINKING: &str = "green_slow_blinking";
pub const LED_BLUE: &str = "blue";
pub const LED_BLUE_BLINKING: &str = "blue_blinking";
pub const LED_BLUE_SLOW_BLINKING: &str = "blue_slow_blinking";
pub const LED_YELLOW: &str = "yellow";
pub const LED_YELLOW_BLINKING: &str = "yellow_blinking";
pub const LED_YELLOW_SLOW_BLINKING: &str = "yellow_slow_blinking";
pub const LED_AMBER: &str = "amber";
pub const LED_AMBER_BLINKING: &str = "amber_blinking";
pub const LED_AMBER_SLOW_BLINKING: &str = "amber_slow_blinking";
pub const LED_HW_CTRL: &str = "hw_ctrl";

pub const PS_POWER_BAD: &str = "power_bad";
pub const PS_FAN_BAD: &str = "fan_bad";
pub const PS_TEMP_BAD: &str = "temp_bad";

pub const FAN_NOT_SPINNING: &str = "not_spinning";

/// Symbol names longer than this never match on a store.
pub const LED_COLOR_NAME_SIZE: usize = 20;

pub const PORT_EEPROM_ADDR: u16 = 0x50;

pub const ISMT_ADAPTER_NAME: &str = "SMBus iSMT adapter";
pub const I801_ADAPTER_NAME: &str = "SMBus I801 adapter";
pub const CP2112_ADAPTER_NAME: &str = "CP2112 SMBus Bridge";
