use std::fs;
use std::os::fd::AsRawFd;
use std::sync::Mutex;

use crate::backend::{RegisterBackend, check_nregs, lock_err};
use crate::enums::{SmbusReadWrite, SmbusSize};
use crate::error::{Error, Result};
use crate::{
    DEV_I2C_PREFIX, I2C_SMBUS_BLOCK_MAX, i2c_set_slave, i2c_set_slave_force, i2c_smbus_access,
    i2c_smbus_data, i2c_smbus_ioctl_data,
};

/// The SMBus transactions a register backend is built from.
pub trait SmbusOps: Send + Sync {
    fn read_byte(&self) -> Result<u8>;
    fn read_byte_data(&self, command: u8) -> Result<u8>;
    fn write_byte_data(&self, command: u8, val: u8) -> Result<()>;
    fn write_word_data(&self, command: u8, val: u16) -> Result<()>;
}

/// An i2c-dev handle bound to one slave address.
#[derive(Debug)]
pub struct SmbusClient {
    pub bus: u32,
    pub addr: u16,
    file: fs::File,
}

impl SmbusClient {
    pub fn open(bus: u32, addr: u16) -> Result<Self> {
        Self::open_inner(bus, addr, false)
    }

    /// Bind even when a kernel driver already claims `addr`.
    pub fn open_force(bus: u32, addr: u16) -> Result<Self> {
        Self::open_inner(bus, addr, true)
    }

    fn open_inner(bus: u32, addr: u16, force: bool) -> Result<Self> {
        let path = format!("{}{}", DEV_I2C_PREFIX, bus);
        let file = fs::File::options().read(true).write(true).open(&path).map_err(|e| {
            log::debug!("SmbusClient::open - Error opening {}: {}", path, e);
            e
        })?;

        let fd = file.as_raw_fd();
        let r = unsafe {
            if force {
                i2c_set_slave_force(fd, addr as i32)
            } else {
                i2c_set_slave(fd, addr as i32)
            }
        };

        match r {
            Ok(_) => {
                log::debug!("SmbusClient::open - bound {} to 0x{:02x} (force: {})", path, addr, force);
                Ok(SmbusClient { bus, addr, file })
            }
            Err(e) => {
                log::debug!("SmbusClient::open - Error binding 0x{:02x} on {}: {}", addr, path, e);
                Err(e.into())
            }
        }
    }

    fn access(
        &self,
        read_write: SmbusReadWrite,
        command: u8,
        size: SmbusSize,
        data: &mut i2c_smbus_data,
    ) -> Result<()> {
        let args = i2c_smbus_ioctl_data {
            read_write: read_write as u8,
            command,
            size: size as u32,
            data: data as *mut i2c_smbus_data,
        };

        let fd = self.file.as_raw_fd();
        let r = unsafe { i2c_smbus_access(fd, &args) };

        match r {
            Ok(_) => Ok(()),
            Err(e) => {
                log::debug!("smbus {:?} {:?} failed - bus: {}, addr: 0x{:02x}, command: 0x{:02x}, errno: {}",
                    read_write,
                    size,
                    self.bus,
                    self.addr,
                    command,
                    e
                );
                Err(e.into())
            }
        }
    }

    fn empty_data() -> i2c_smbus_data {
        i2c_smbus_data { block: [0; I2C_SMBUS_BLOCK_MAX + 2] }
    }

    pub fn write_byte(&self, val: u8) -> Result<()> {
        let mut data = Self::empty_data();
        self.access(SmbusReadWrite::Write, val, SmbusSize::Byte, &mut data)
    }
}

impl SmbusOps for SmbusClient {
    fn read_byte(&self) -> Result<u8> {
        let mut data = Self::empty_data();
        self.access(SmbusReadWrite::Read, 0, SmbusSize::Byte, &mut data)?;
        Ok(unsafe { data.byte })
    }

    fn read_byte_data(&self, command: u8) -> Result<u8> {
        let mut data = Self::empty_data();
        self.access(SmbusReadWrite::Read, command, SmbusSize::ByteData, &mut data)?;
        let val = unsafe { data.byte };
        log::trace!("read_byte_data - bus: {}, addr: 0x{:02x}, command: 0x{:02x}, val: 0x{:02x}",
            self.bus, self.addr, command, val);
        Ok(val)
    }

    fn write_byte_data(&self, command: u8, val: u8) -> Result<()> {
        let mut data = i2c_smbus_data { byte: val };
        log::trace!("write_byte_data - bus: {}, addr: 0x{:02x}, command: 0x{:02x}, val: 0x{:02x}",
            self.bus, self.addr, command, val);
        self.access(SmbusReadWrite::Write, command, SmbusSize::ByteData, &mut data)
    }

    fn write_word_data(&self, command: u8, val: u16) -> Result<()> {
        let mut data = i2c_smbus_data { word: val };
        self.access(SmbusReadWrite::Write, command, SmbusSize::WordData, &mut data)
    }
}

fn command_for(reg: u32, nregs: usize) -> Result<u8> {
    check_nregs(nregs)?;
    if reg as usize + nregs > 0x100 {
        return Err(Error::invalid_argument(format!(
            "registers 0x{:x}..0x{:x} outside the 8-bit command space", reg, reg as usize + nregs
        )));
    }
    Ok(reg as u8)
}

/// One byte-data transaction per register.
impl RegisterBackend for SmbusClient {
    fn read(&self, reg: u32, nregs: usize) -> Result<u32> {
        let command = command_for(reg, nregs)?;

        let mut val = 0u32;
        for i in 0..nregs {
            let b = self.read_byte_data(command + i as u8)?;
            val |= (b as u32) << (i * 8);
        }
        Ok(val)
    }

    fn write(&self, reg: u32, nregs: usize, val: u32) -> Result<()> {
        let command = command_for(reg, nregs)?;

        for i in 0..nregs {
            self.write_byte_data(command + i as u8, (val >> (i * 8)) as u8)?;
        }
        Ok(())
    }
}

/// CPLDs that latch a register pointer written to command 0, answer a
/// receive-byte with the pointed-to register, and take writes as a word
/// `(value << 8) | register`.
#[derive(Debug)]
pub struct Addr16Smbus<C: SmbusOps = SmbusClient> {
    client: C,
    lock: Mutex<()>,
}

impl<C: SmbusOps> Addr16Smbus<C> {
    pub fn new(client: C) -> Self {
        Addr16Smbus {
            client,
            lock: Mutex::new(()),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn read_one(&self, reg: u8) -> Result<u8> {
        self.client.write_byte_data(0x0, reg).map_err(|e| {
            log::error!("16-bit addr write failed for addr: 0x{:x}", reg);
            e
        })?;
        self.client.read_byte().map_err(|e| {
            log::error!("Read failed for addr: 0x{:x}", reg);
            e
        })
    }
}

impl<C: SmbusOps> RegisterBackend for Addr16Smbus<C> {
    fn read(&self, reg: u32, nregs: usize) -> Result<u32> {
        let command = command_for(reg, nregs)?;
        let _guard = self.lock.lock().map_err(lock_err)?;

        let mut val = 0u32;
        for i in 0..nregs {
            val |= (self.read_one(command + i as u8)? as u32) << (i * 8);
        }
        Ok(val)
    }

    fn write(&self, reg: u32, nregs: usize, val: u32) -> Result<()> {
        let command = command_for(reg, nregs)?;
        let _guard = self.lock.lock().map_err(lock_err)?;

        for i in 0..nregs {
            let r = command + i as u8;
            let b = (val >> (i * 8)) as u8;
            self.client.write_word_data(0x0, ((b as u16) << 8) | r as u16).map_err(|e| {
                log::error!("Write failed for addr: 0x{:x}", r);
                e
            })?;
        }
        Ok(())
    }
}
