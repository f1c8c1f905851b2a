//! In-memory stand-ins for the hardware and the kernel.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time;

use dashmap::DashMap;
use hashbrown::{HashMap, HashSet};
use nix::errno::Errno;

use crate::backend::{RegisterBackend, SmbusOps, check_nregs, lock_err};
use crate::bitfield::helpers::{assemble_le, split_le};
use crate::error::{Error, Result};
use crate::topology::{Adapter, AdapterEnumerator, ClientFactory, Clock};

/// A bank of 8-bit registers. Unwritten registers read as zero.
#[derive(Debug, Default)]
pub struct SimRegisters {
    regs: DashMap<u32, u8>,
    pub reads: AtomicU64,
    pub writes: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_log: Mutex<Vec<(u32, u8)>>,
    /// Upper bound, in microseconds, of a random delay before each access.
    pub access_delay: Option<u64>,
}

impl SimRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(max_delay_us: u64) -> Self {
        SimRegisters {
            access_delay: Some(max_delay_us),
            ..Self::default()
        }
    }

    pub fn set(&self, reg: u32, val: u8) {
        self.regs.insert(reg, val);
    }

    pub fn get(&self, reg: u32) -> u8 {
        self.regs.get(&reg).map(|v| *v).unwrap_or(0)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every byte written, in order.
    pub fn write_log(&self) -> Vec<(u32, u8)> {
        self.write_log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn delay(&self) {
        if let Some(max_delay) = self.access_delay {
            if max_delay > 0 {
                let delay = rand::random_range(0..=max_delay);
                log::trace!("Delaying access by {}us", delay);
                std::thread::sleep(time::Duration::from_micros(delay));
            }
        }
    }
}

impl RegisterBackend for SimRegisters {
    fn read(&self, reg: u32, nregs: usize) -> Result<u32> {
        check_nregs(nregs)?;
        self.delay();
        self.reads.fetch_add(1, Ordering::SeqCst);

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Errno::EIO.into());
        }

        let bytes: Vec<u8> = (0..nregs).map(|i| self.get(reg + i as u32)).collect();
        let val = assemble_le(&bytes);
        log::trace!("sim read - reg: 0x{:x}, nregs: {}, val: 0x{:x}", reg, nregs, val);
        Ok(val)
    }

    fn write(&self, reg: u32, nregs: usize, val: u32) -> Result<()> {
        check_nregs(nregs)?;
        self.delay();
        self.writes.fetch_add(1, Ordering::SeqCst);

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Errno::EIO.into());
        }

        let mut log = self.write_log.lock().map_err(lock_err)?;
        for (i, b) in split_le(val, nregs).into_iter().enumerate() {
            self.regs.insert(reg + i as u32, b);
            log.push((reg + i as u32, b));
        }
        log::trace!("sim write - reg: 0x{:x}, nregs: {}, val: 0x{:x}", reg, nregs, val);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmbusTransaction {
    ReadByte,
    ReadByteData { command: u8 },
    WriteByteData { command: u8, val: u8 },
    WriteWordData { command: u8, val: u16 },
}

/// A CPLD behind a register pointer: a byte-data write to command 0 moves
/// the pointer, a receive-byte reads the pointed-to register and a word
/// write to command 0 stores the high byte at the register in the low byte.
#[derive(Debug, Default)]
pub struct SimPointerCpld {
    pub regs: SimRegisters,
    pointer: AtomicU8,
    log: Mutex<Vec<SmbusTransaction>>,
}

impl SimPointerCpld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction seen, in order.
    pub fn transactions(&self) -> Vec<SmbusTransaction> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn record(&self, t: SmbusTransaction) -> Result<()> {
        self.log.lock().map_err(lock_err)?.push(t);
        Ok(())
    }
}

impl SmbusOps for SimPointerCpld {
    fn read_byte(&self) -> Result<u8> {
        self.record(SmbusTransaction::ReadByte)?;
        let reg = self.pointer.load(Ordering::SeqCst);
        Ok(self.regs.read(reg as u32, 1)? as u8)
    }

    fn read_byte_data(&self, command: u8) -> Result<u8> {
        self.record(SmbusTransaction::ReadByteData { command })?;
        Ok(self.regs.read(command as u32, 1)? as u8)
    }

    fn write_byte_data(&self, command: u8, val: u8) -> Result<()> {
        self.record(SmbusTransaction::WriteByteData { command, val })?;
        if command == 0 {
            self.pointer.store(val, Ordering::SeqCst);
            Ok(())
        } else {
            self.regs.write(command as u32, 1, val as u32)
        }
    }

    fn write_word_data(&self, command: u8, val: u16) -> Result<()> {
        self.record(SmbusTransaction::WriteWordData { command, val })?;
        if command != 0 {
            return Err(Errno::EIO.into());
        }
        self.regs.write((val & 0xff) as u32, 1, (val >> 8) as u32)
    }
}

/// Adapters that become visible only after a number of polls.
#[derive(Debug, Default)]
pub struct SimAdapters {
    adapters: Mutex<Vec<(Adapter, u32)>>,
    polls: AtomicU32,
}

impl SimAdapters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, bus: u32, name: &str) {
        self.add_at_poll(bus, name, 1);
    }

    /// `bus` is listed from the `poll`th enumeration on (1-based).
    pub fn add_at_poll(&self, bus: u32, name: &str, poll: u32) {
        if let Ok(mut adapters) = self.adapters.lock() {
            adapters.push((Adapter { bus, name: name.to_string() }, poll));
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

impl AdapterEnumerator for SimAdapters {
    fn adapters(&self) -> Result<Vec<Adapter>> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        let adapters = self.adapters.lock().map_err(lock_err)?;

        Ok(adapters
            .iter()
            .filter(|(_, visible_at)| poll >= *visible_at)
            .map(|(a, _)| a.clone())
            .collect())
    }

    fn adapter_exists(&self, bus: u32) -> Result<bool> {
        Ok(self.adapters()?.iter().any(|a| a.bus == bus))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Created { bus: u32, addr: u16, driver: String },
    Deleted { bus: u32, addr: u16 },
}

#[derive(Debug, Default)]
struct FactoryState {
    live: BTreeMap<(u32, u16), String>,
    events: Vec<ClientEvent>,
    channels: HashMap<(u32, u16), Vec<u32>>,
    idle: HashMap<(u32, u16), bool>,
    next_bus: u32,
}

/// Records client creation and deletion. Muxes get fresh channel buses
/// counted up from `first_mux_bus`, and those buses are added to the
/// paired [`SimAdapters`] when one is given.
#[derive(Debug, Default)]
pub struct SimClientFactory<'a> {
    state: Mutex<FactoryState>,
    fail_at: Mutex<HashSet<(u32, u16)>>,
    responders: Mutex<HashSet<(u32, u16)>>,
    adapters: Option<&'a SimAdapters>,
}

impl<'a> SimClientFactory<'a> {
    pub fn new(first_mux_bus: u32) -> Self {
        SimClientFactory {
            state: Mutex::new(FactoryState {
                next_bus: first_mux_bus,
                ..FactoryState::default()
            }),
            ..Self::default()
        }
    }

    pub fn with_adapters(first_mux_bus: u32, adapters: &'a SimAdapters) -> Self {
        SimClientFactory {
            adapters: Some(adapters),
            ..Self::new(first_mux_bus)
        }
    }

    /// Make `new_client` fail for this bus and address.
    pub fn fail_at(&self, bus: u32, addr: u16) {
        if let Ok(mut f) = self.fail_at.lock() {
            f.insert((bus, addr));
        }
    }

    /// Make `check_present` succeed for this bus and address.
    pub fn respond_at(&self, bus: u32, addr: u16) {
        if let Ok(mut r) = self.responders.lock() {
            r.insert((bus, addr));
        }
    }

    pub fn live(&self) -> Vec<(u32, u16, String)> {
        self.state
            .lock()
            .map(|s| s.live.iter().map(|(&(b, a), d)| (b, a, d.clone())).collect())
            .unwrap_or_default()
    }

    /// The last `set_mux_idle` for this mux: true when it deselects.
    pub fn mux_idle(&self, bus: u32, addr: u16) -> Option<bool> {
        self.state.lock().ok().and_then(|s| s.idle.get(&(bus, addr)).copied())
    }

    pub fn events(&self) -> Vec<ClientEvent> {
        self.state.lock().map(|s| s.events.clone()).unwrap_or_default()
    }
}

impl ClientFactory for SimClientFactory<'_> {
    fn new_client(&self, bus: u32, addr: u16, driver: &str) -> Result<()> {
        if self.fail_at.lock().map_err(lock_err)?.contains(&(bus, addr)) {
            log::debug!("sim: refusing {} at i2c-{} 0x{:02x}", driver, bus, addr);
            return Err(Error::not_found(format!("no device at i2c-{} 0x{:02x}", bus, addr)));
        }

        let mut state = self.state.lock().map_err(lock_err)?;
        if state.live.contains_key(&(bus, addr)) {
            return Err(Errno::EBUSY.into());
        }
        state.live.insert((bus, addr), driver.to_string());
        state.events.push(ClientEvent::Created { bus, addr, driver: driver.to_string() });
        Ok(())
    }

    fn delete_client(&self, bus: u32, addr: u16) -> Result<()> {
        let mut state = self.state.lock().map_err(lock_err)?;
        if state.live.remove(&(bus, addr)).is_none() {
            return Err(Error::not_found(format!("no client at i2c-{} 0x{:02x}", bus, addr)));
        }
        state.events.push(ClientEvent::Deleted { bus, addr });
        Ok(())
    }

    fn mux_channels(&self, bus: u32, addr: u16, count: u8) -> Result<Vec<u32>> {
        let mut state = self.state.lock().map_err(lock_err)?;
        if !state.live.contains_key(&(bus, addr)) {
            return Err(Error::not_found(format!("no mux at i2c-{} 0x{:02x}", bus, addr)));
        }

        if let Some(channels) = state.channels.get(&(bus, addr)) {
            return Ok(channels.clone());
        }

        let first = state.next_bus;
        state.next_bus += count as u32;
        let channels: Vec<u32> = (first..first + count as u32).collect();

        if let Some(adapters) = self.adapters {
            for (i, &child) in channels.iter().enumerate() {
                adapters.add_at_poll(child, &format!("i2c-{}-mux (chan_id {})", bus, i), 0);
            }
        }

        state.channels.insert((bus, addr), channels.clone());
        Ok(channels)
    }

    fn set_mux_idle(&self, bus: u32, addr: u16, deselect: bool) -> Result<()> {
        let mut state = self.state.lock().map_err(lock_err)?;
        if !state.live.contains_key(&(bus, addr)) {
            return Err(Error::not_found(format!("no mux at i2c-{} 0x{:02x}", bus, addr)));
        }
        state.idle.insert((bus, addr), deselect);
        Ok(())
    }

    fn check_present(&self, bus: u32, addr: u16) -> Result<()> {
        if self.responders.lock().map_err(lock_err)?.contains(&(bus, addr)) {
            Ok(())
        } else {
            Err(Errno::ENXIO.into())
        }
    }
}

/// Records sleeps instead of sleeping.
#[derive(Debug, Default)]
pub struct FakeClock {
    slept: Mutex<Vec<time::Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<time::Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn total(&self) -> time::Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for FakeClock {
    fn sleep(&self, duration: time::Duration) {
        if let Ok(mut s) = self.slept.lock() {
            s.push(duration);
        }
    }
}
