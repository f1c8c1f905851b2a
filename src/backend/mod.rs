use std::sync::{Arc, Mutex};

use crate::bitfield::{FieldValue, RegisterField};
use crate::error::{Error, Result};

pub mod mailbox;
pub mod port;
pub mod smbus;

pub use mailbox::{Mailbox, MailboxRegs};
pub use port::PortIo;
pub use smbus::{Addr16Smbus, SmbusClient, SmbusOps};

/// Byte-level access to a bank of 8-bit registers.
///
/// `read` returns registers `reg..reg + nregs` packed little endian, byte
/// `i` from register `reg + i`. `write` is the inverse. `nregs` is 1 to 4.
pub trait RegisterBackend: Send + Sync {
    fn read(&self, reg: u32, nregs: usize) -> Result<u32>;
    fn write(&self, reg: u32, nregs: usize, val: u32) -> Result<()>;
}

impl<B: RegisterBackend + ?Sized> RegisterBackend for &B {
    fn read(&self, reg: u32, nregs: usize) -> Result<u32> {
        (**self).read(reg, nregs)
    }

    fn write(&self, reg: u32, nregs: usize, val: u32) -> Result<()> {
        (**self).write(reg, nregs, val)
    }
}

impl<B: RegisterBackend + ?Sized> RegisterBackend for Arc<B> {
    fn read(&self, reg: u32, nregs: usize) -> Result<u32> {
        (**self).read(reg, nregs)
    }

    fn write(&self, reg: u32, nregs: usize, val: u32) -> Result<()> {
        (**self).write(reg, nregs, val)
    }
}

impl<B: RegisterBackend + ?Sized> RegisterBackend for Box<B> {
    fn read(&self, reg: u32, nregs: usize) -> Result<u32> {
        (**self).read(reg, nregs)
    }

    fn write(&self, reg: u32, nregs: usize, val: u32) -> Result<()> {
        (**self).write(reg, nregs, val)
    }
}

pub(crate) fn check_nregs(nregs: usize) -> Result<()> {
    if !(1..=4).contains(&nregs) {
        return Err(Error::invalid_argument(format!("cannot access {} registers at once", nregs)));
    }
    Ok(())
}

/// One physical register bank shared by many fields.
///
/// The lock is held across the read and the write of a partial-register
/// store so two stores to neighbouring bits cannot lose each other's update.
#[derive(Debug)]
pub struct RegisterBank<B: RegisterBackend> {
    backend: B,
    lock: Mutex<()>,
}

impl<B: RegisterBackend> RegisterBank<B> {
    pub fn new(backend: B) -> Self {
        RegisterBank {
            backend,
            lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run `f` against the backend with the bank locked.
    pub fn locked<T>(&self, f: impl FnOnce(&B) -> Result<T>) -> Result<T> {
        let _guard = self.lock.lock().map_err(lock_err)?;
        f(&self.backend)
    }

    pub fn show(&self, field: &RegisterField) -> Result<FieldValue> {
        let _guard = self.lock.lock().map_err(lock_err)?;
        field.read(&self.backend)
    }

    pub fn store(&self, field: &RegisterField, input: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(lock_err)?;
        field.write(&self.backend, input)
    }
}

pub(crate) fn lock_err<T>(e: std::sync::PoisonError<T>) -> Error {
    Error::Io(std::io::Error::other(format!("lock poisoned: {}", e)))
}
