use std::fs;
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::DEV_PORT;
use crate::backend::{RegisterBackend, check_nregs};
use crate::bitfield::helpers::{assemble_le, split_le};
use crate::error::{Error, Result};

/// A window of x86 I/O ports reached through `/dev/port`.
#[derive(Debug)]
pub struct PortIo {
    base: u64,
    len: u32,
    file: fs::File,
}

impl PortIo {
    pub fn open(base: u64, len: u32) -> Result<Self> {
        Self::open_path(Path::new(DEV_PORT), base, len)
    }

    /// Any seekable file stands in for `/dev/port`.
    pub fn open_path(path: &Path, base: u64, len: u32) -> Result<Self> {
        let file = fs::File::options().read(true).write(true).open(path).map_err(|e| {
            log::debug!("PortIo::open - Error opening {:?}: {}", path, e);
            e
        })?;

        log::debug!("PortIo::open - {:?} window 0x{:x}+0x{:x}", path, base, len);
        Ok(PortIo { base, len, file })
    }

    fn check_window(&self, reg: u32, nregs: usize) -> Result<u64> {
        check_nregs(nregs)?;
        if reg as u64 + nregs as u64 > self.len as u64 {
            return Err(Error::invalid_argument(format!(
                "port 0x{:x}+{} outside window of 0x{:x}", reg, nregs, self.len
            )));
        }
        Ok(self.base + reg as u64)
    }
}

impl RegisterBackend for PortIo {
    fn read(&self, reg: u32, nregs: usize) -> Result<u32> {
        let offset = self.check_window(reg, nregs)?;
        let mut buf = [0u8; 4];

        self.file.read_exact_at(&mut buf[..nregs], offset).map_err(|e| {
            log::debug!("PortIo::read - Error reading port 0x{:x}: {}", offset, e);
            e
        })?;

        Ok(assemble_le(&buf[..nregs]))
    }

    fn write(&self, reg: u32, nregs: usize, val: u32) -> Result<()> {
        let offset = self.check_window(reg, nregs)?;
        let buf = split_le(val, nregs);

        self.file.write_all_at(&buf, offset).map_err(|e| {
            log::debug!("PortIo::write - Error writing port 0x{:x}: {}", offset, e);
            e
        })?;

        Ok(())
    }
}
