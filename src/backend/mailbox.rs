use std::sync::Mutex;

use crate::backend::{RegisterBackend, check_nregs, lock_err};
use crate::error::Result;

/// Offsets, in the parent's register space, of the registers that
/// front an indirect register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxRegs {
    pub addr_hi: u32,
    pub addr_lo: u32,
    pub read_data: u32,
    pub write_data: u32,
}

impl MailboxRegs {
    /// Dell SmartFusion RAM window.
    pub const SMF: MailboxRegs = MailboxRegs {
        addr_hi: 0x210,
        addr_lo: 0x211,
        read_data: 0x212,
        write_data: 0x213,
    };
}

/// A 16-bit addressed register file reached through an address latch and
/// a data register on a parent backend.
///
/// Every byte is a latch of both address halves followed by one data
/// access. The whole multi-byte access runs under one lock so another
/// thread cannot move the latch in between.
#[derive(Debug)]
pub struct Mailbox<B: RegisterBackend> {
    parent: B,
    regs: MailboxRegs,
    lock: Mutex<()>,
}

impl<B: RegisterBackend> Mailbox<B> {
    pub fn new(parent: B, regs: MailboxRegs) -> Self {
        Mailbox {
            parent,
            regs,
            lock: Mutex::new(()),
        }
    }

    pub fn parent(&self) -> &B {
        &self.parent
    }

    fn latch(&self, addr: u32) -> Result<()> {
        let addr = addr & 0xffff;
        self.parent.write(self.regs.addr_hi, 1, addr >> 8)?;
        self.parent.write(self.regs.addr_lo, 1, addr & 0xff)
    }
}

impl<B: RegisterBackend> RegisterBackend for Mailbox<B> {
    fn read(&self, reg: u32, nregs: usize) -> Result<u32> {
        check_nregs(nregs)?;
        let _guard = self.lock.lock().map_err(lock_err)?;

        let mut val = 0u32;
        for i in 0..nregs {
            // the address wraps within 16 bits
            self.latch(reg.wrapping_add(i as u32))?;
            let b = self.parent.read(self.regs.read_data, 1)? & 0xff;
            val |= b << (i * 8);
        }

        log::trace!("mailbox read - reg: 0x{:04x}, nregs: {}, val: 0x{:x}", reg, nregs, val);
        Ok(val)
    }

    fn write(&self, reg: u32, nregs: usize, val: u32) -> Result<()> {
        check_nregs(nregs)?;
        let _guard = self.lock.lock().map_err(lock_err)?;

        log::trace!("mailbox write - reg: 0x{:04x}, nregs: {}, val: 0x{:x}", reg, nregs, val);
        for i in 0..nregs {
            self.latch(reg.wrapping_add(i as u32))?;
            self.parent.write(self.regs.write_data, 1, (val >> (i * 8)) & 0xff)?;
        }
        Ok(())
    }
}
