use std::fs;
use std::io;
use std::path::Path;

use nix::{ioctl_write_int_bad, ioctl_write_ptr_bad};

pub mod attr;
pub mod backend;
pub mod bitfield;
pub mod boards;
pub mod defs;
pub mod enums;
pub mod error;
pub mod sim;
pub mod topology;

pub use error::{Error, Result};

pub const I2C_SLAVE: u32 = 0x0703;
pub const I2C_SLAVE_FORCE: u32 = 0x0706;
pub const I2C_SMBUS: u32 = 0x0720;

pub const I2C_SMBUS_BLOCK_MAX: usize = 32;

pub const SYS_I2C_ADAPTERS: &str = "/sys/class/i2c-adapter";
pub const SYS_I2C_DEVICES: &str = "/sys/bus/i2c/devices";
pub const DEV_I2C_PREFIX: &str = "/dev/i2c-";
pub const DEV_PORT: &str = "/dev/port";

/// Values of a pca954x `idle_state` attribute.
pub const MUX_IDLE_AS_IS: i32 = -1;
pub const MUX_IDLE_DISCONNECT: i32 = -2;

#[derive(Clone, Copy)]
#[repr(C)]
#[allow(non_camel_case_types)]
pub union i2c_smbus_data {
    pub byte: u8,
    pub word: u16,
    pub block: [u8; I2C_SMBUS_BLOCK_MAX + 2],
}

#[derive(Debug)]
#[repr(C)]
#[allow(non_camel_case_types)]
pub struct i2c_smbus_ioctl_data {
    pub read_write: u8,
    pub command: u8,
    pub size: u32,
    pub data: *mut i2c_smbus_data,
}

ioctl_write_int_bad!(i2c_set_slave, I2C_SLAVE);
ioctl_write_int_bad!(i2c_set_slave_force, I2C_SLAVE_FORCE);
ioctl_write_ptr_bad!(i2c_smbus_access, I2C_SMBUS, i2c_smbus_ioctl_data);

/// Bus numbers of the adapters listed under `root`, e.g. `i2c-3` yields 3.
pub fn get_adapter_buses(root: &Path) -> Result<Vec<u32>> {
    log::debug!("Reading directory: {:?}", root);

    if !fs::exists(root)? {
        log::debug!("Directory '{:?}' does not exist", root);
        return Err(Error::not_found(format!("{} does not exist", root.display())));
    }

    let mut buses: Vec<u32> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();

        match file_name.strip_prefix("i2c-").map(|n| n.parse::<u32>()) {
            Some(Ok(bus)) => {
                log::trace!("Found adapter, path={:?} bus={}", entry.path(), bus);
                buses.push(bus);
            }
            _ => {
                log::trace!("Skipping entry {:?}", entry.path());
            }
        }
    }
    buses.sort_unstable();

    Ok(buses)
}

/// `(bus, name)` for every adapter the kernel currently knows about.
pub fn get_adapter_names(root: &Path) -> Result<Vec<(u32, String)>> {
    let mut adapters = Vec::new();

    for bus in get_adapter_buses(root)? {
        let name_path = root.join(format!("i2c-{}", bus)).join("name");
        match fs::read_to_string(&name_path) {
            Ok(name) => adapters.push((bus, name.trim_end().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // adapter went away between readdir and open
                log::debug!("Adapter i2c-{} has no name file", bus);
            }
            Err(e) => return Err(e.into()),
        }
    }

    log::debug!("get_adapter_names returned {} entries", adapters.len());
    Ok(adapters)
}
