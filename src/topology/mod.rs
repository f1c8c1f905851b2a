//! Turning a static device table into live I2C clients.
//!
//! Host adapters are located by name, devices are instantiated in table
//! order and mux channel buses are learned as the muxes appear. Every
//! client created is held by a [`ClientGuard`]; if bootstrap fails partway
//! the guards already taken are released newest first.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use hashbrown::HashMap;

use crate::backend::{SmbusClient, SmbusOps};
use crate::attr::gpio_map_show;
use crate::defs::PORT_EEPROM_ADDR;
use crate::enums::MuxChip;
use crate::error::{Error, Result};
use crate::{MUX_IDLE_AS_IS, MUX_IDLE_DISCONNECT, SYS_I2C_ADAPTERS, SYS_I2C_DEVICES, get_adapter_names};

pub trait Clock {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// How long to keep looking for something the kernel creates
/// asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        RetryPolicy {
            attempts: attempts.max(1),
            interval,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(20, Duration::from_millis(100))
    }
}

/// Call `f` until it yields a value, at most `policy.attempts` times,
/// sleeping `policy.interval` between calls.
fn poll<T>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    what: &str,
    mut f: impl FnMut() -> Result<Option<T>>,
) -> Result<T> {
    let attempts = policy.attempts.max(1);

    for attempt in 0..attempts {
        match f() {
            Ok(Some(v)) => {
                log::trace!("{} ready after {} attempt(s)", what, attempt + 1);
                return Ok(v);
            }
            Ok(None) => {
                log::trace!("{} not ready (attempt {}/{})", what, attempt + 1, attempts);
            }
            Err(e) => {
                log::debug!("{} lookup failed (attempt {}/{}): {}", what, attempt + 1, attempts, e);
            }
        }

        if attempt + 1 < attempts {
            clock.sleep(policy.interval);
        }
    }

    Err(Error::not_found(format!("{} did not appear after {} attempts", what, attempts)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adapter {
    pub bus: u32,
    pub name: String,
}

pub trait AdapterEnumerator {
    fn adapters(&self) -> Result<Vec<Adapter>>;

    fn adapter_exists(&self, bus: u32) -> Result<bool> {
        Ok(self.adapters()?.iter().any(|a| a.bus == bus))
    }
}

/// Adapters as listed by `/sys/class/i2c-adapter`.
#[derive(Debug, Clone)]
pub struct SysfsAdapters {
    root: PathBuf,
}

impl SysfsAdapters {
    pub fn new() -> Self {
        Self::with_root(SYS_I2C_ADAPTERS)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        SysfsAdapters { root: root.into() }
    }
}

impl Default for SysfsAdapters {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterEnumerator for SysfsAdapters {
    fn adapters(&self) -> Result<Vec<Adapter>> {
        Ok(get_adapter_names(&self.root)?
            .into_iter()
            .map(|(bus, name)| Adapter { bus, name })
            .collect())
    }

    fn adapter_exists(&self, bus: u32) -> Result<bool> {
        Ok(fs::exists(self.root.join(format!("i2c-{}", bus)))?)
    }
}

/// Bus number of the adapter whose name starts with `name`. When several
/// match, the lowest bus number wins.
pub fn find_adapter(
    enumerator: &dyn AdapterEnumerator,
    name: &str,
    policy: &RetryPolicy,
    clock: &dyn Clock,
) -> Result<u32> {
    let bus = poll(policy, clock, &format!("adapter '{}'", name), || {
        Ok(enumerator
            .adapters()?
            .iter()
            .filter(|a| a.name.starts_with(name))
            .map(|a| a.bus)
            .min())
    })?;

    log::info!("Found adapter '{}' at i2c-{}", name, bus);
    Ok(bus)
}

/// Wait for a numbered bus. Mux channel adapters show up some time after
/// the mux itself is bound.
pub fn wait_for_bus(
    enumerator: &dyn AdapterEnumerator,
    bus: u32,
    policy: &RetryPolicy,
    clock: &dyn Clock,
) -> Result<()> {
    poll(policy, clock, &format!("i2c-{}", bus), || {
        Ok(enumerator.adapter_exists(bus)?.then_some(()))
    })
}

/// Where a device sits, before bus numbers are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusRef {
    Fixed(u32),
    /// A host adapter, by name prefix.
    Adapter(&'static str),
    /// A mux channel, numbered by [`MuxConfig::first_virtual`].
    Virtual(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromConfig {
    pub chip: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortEepromConfig {
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxConfig {
    pub chip: MuxChip,
    /// Virtual bus number given to channel 0; channel `i` is
    /// `first_virtual + i`.
    pub first_virtual: u32,
    /// Disconnect every channel once a transfer completes.
    pub deselect_on_exit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpldConfig {
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioConfig {
    pub chip: &'static str,
    pub base: u32,
    pub lines: &'static [&'static str],
}

impl GpioConfig {
    pub fn map(&self) -> String {
        gpio_map_show(self.base, self.lines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Eeprom(EepromConfig),
    PortEeprom(PortEepromConfig),
    Mux(MuxConfig),
    Cpld(CpldConfig),
    GpioExpander(GpioConfig),
    Sensor(&'static str),
    PowerSupply(&'static str),
}

impl DeviceKind {
    /// Kernel driver bound to the client.
    pub fn driver(&self) -> &'static str {
        match self {
            DeviceKind::Eeprom(c) => c.chip,
            DeviceKind::PortEeprom(_) => "sff8436",
            DeviceKind::Mux(c) => c.chip.driver(),
            DeviceKind::Cpld(c) => c.name,
            DeviceKind::GpioExpander(c) => c.chip,
            DeviceKind::Sensor(d) | DeviceKind::PowerSupply(d) => d,
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        match self {
            DeviceKind::Eeprom(c) => Some(c.label),
            DeviceKind::PortEeprom(c) => Some(c.label),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    pub bus: BusRef,
    pub addr: u16,
    pub kind: DeviceKind,
}

impl DeviceSpec {
    pub const fn new(bus: BusRef, addr: u16, kind: DeviceKind) -> Self {
        DeviceSpec { bus, addr, kind }
    }

    pub const fn mux(bus: BusRef, addr: u16, chip: MuxChip, first_virtual: u32, deselect_on_exit: bool) -> Self {
        Self::new(bus, addr, DeviceKind::Mux(MuxConfig { chip, first_virtual, deselect_on_exit }))
    }

    pub const fn eeprom(bus: BusRef, addr: u16, chip: &'static str, label: &'static str) -> Self {
        Self::new(bus, addr, DeviceKind::Eeprom(EepromConfig { chip, label }))
    }

    pub const fn qsfp(bus: BusRef, label: &'static str) -> Self {
        Self::new(bus, PORT_EEPROM_ADDR, DeviceKind::PortEeprom(PortEepromConfig { label }))
    }

    pub const fn gpio(bus: BusRef, addr: u16, chip: &'static str, base: u32, lines: &'static [&'static str]) -> Self {
        Self::new(bus, addr, DeviceKind::GpioExpander(GpioConfig { chip, base, lines }))
    }

    pub const fn cpld(bus: BusRef, addr: u16, name: &'static str) -> Self {
        Self::new(bus, addr, DeviceKind::Cpld(CpldConfig { name }))
    }

    pub const fn sensor(bus: BusRef, addr: u16, driver: &'static str) -> Self {
        Self::new(bus, addr, DeviceKind::Sensor(driver))
    }

    pub const fn psu(bus: BusRef, addr: u16, driver: &'static str) -> Self {
        Self::new(bus, addr, DeviceKind::PowerSupply(driver))
    }
}

/// Creates and removes kernel I2C clients.
pub trait ClientFactory {
    fn new_client(&self, bus: u32, addr: u16, driver: &str) -> Result<()>;
    fn delete_client(&self, bus: u32, addr: u16) -> Result<()>;
    /// Channel buses the mux at `bus`/`addr` has created so far, in
    /// channel order.
    fn mux_channels(&self, bus: u32, addr: u16, count: u8) -> Result<Vec<u32>>;
    /// Whether the mux disconnects its channels when idle.
    fn set_mux_idle(&self, bus: u32, addr: u16, deselect: bool) -> Result<()>;
    /// Succeeds when the device answers a read of byte 0.
    fn check_present(&self, bus: u32, addr: u16) -> Result<()>;
}

/// Clients through `/sys/bus/i2c/devices/i2c-N/{new_device,delete_device}`.
#[derive(Debug, Clone)]
pub struct SysfsClientFactory {
    root: PathBuf,
}

impl SysfsClientFactory {
    pub fn new() -> Self {
        Self::with_root(SYS_I2C_DEVICES)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        SysfsClientFactory { root: root.into() }
    }

    fn bus_dir(&self, bus: u32) -> PathBuf {
        self.root.join(format!("i2c-{}", bus))
    }

    fn client_dir(&self, bus: u32, addr: u16) -> PathBuf {
        self.root.join(format!("{}-{:04x}", bus, addr))
    }

    fn write_ctl(&self, path: &Path, line: &str) -> Result<()> {
        log::debug!("Writing '{}' to {:?}", line, path);
        fs::write(path, format!("{}\n", line)).map_err(|e| {
            log::debug!("Error writing {:?}: {}", path, e);
            e.into()
        })
    }
}

impl Default for SysfsClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientFactory for SysfsClientFactory {
    fn new_client(&self, bus: u32, addr: u16, driver: &str) -> Result<()> {
        self.write_ctl(&self.bus_dir(bus).join("new_device"), &format!("{} 0x{:02x}", driver, addr))
    }

    fn delete_client(&self, bus: u32, addr: u16) -> Result<()> {
        self.write_ctl(&self.bus_dir(bus).join("delete_device"), &format!("0x{:02x}", addr))
    }

    fn mux_channels(&self, bus: u32, addr: u16, count: u8) -> Result<Vec<u32>> {
        let dev = self.client_dir(bus, addr);
        let mut buses = Vec::with_capacity(count as usize);

        for ch in 0..count {
            let link = dev.join(format!("channel-{}", ch));
            let target = match fs::read_link(&link) {
                Ok(t) => t,
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(e) => return Err(e.into()),
            };

            let child = target
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("i2c-"))
                .and_then(|n| n.parse::<u32>().ok())
                .ok_or_else(|| Error::not_found(format!("{:?} does not point at an i2c bus", link)))?;

            log::trace!("{:?} -> i2c-{}", link, child);
            buses.push(child);
        }

        Ok(buses)
    }

    fn set_mux_idle(&self, bus: u32, addr: u16, deselect: bool) -> Result<()> {
        let state = if deselect { MUX_IDLE_DISCONNECT } else { MUX_IDLE_AS_IS };
        self.write_ctl(&self.client_dir(bus, addr).join("idle_state"), &state.to_string())
    }

    fn check_present(&self, bus: u32, addr: u16) -> Result<()> {
        SmbusClient::open_force(bus, addr)?.read_byte_data(0).map(|_| ())
    }
}

/// A live client. Dropping the guard deletes the client.
pub struct ClientGuard<'f> {
    factory: &'f dyn ClientFactory,
    pub bus: u32,
    pub addr: u16,
    pub kind: DeviceKind,
    armed: bool,
}

impl<'f> ClientGuard<'f> {
    pub fn create(factory: &'f dyn ClientFactory, bus: u32, addr: u16, kind: DeviceKind) -> Result<Self> {
        factory.new_client(bus, addr, kind.driver())?;
        log::debug!("Created {} at i2c-{} 0x{:02x}", kind.driver(), bus, addr);

        Ok(ClientGuard {
            factory,
            bus,
            addr,
            kind,
            armed: true,
        })
    }

    pub fn check_present(&self) -> Result<()> {
        self.factory.check_present(self.bus, self.addr)
    }

    /// Delete the client now and report the outcome.
    pub fn release(mut self) -> Result<()> {
        self.armed = false;
        self.factory.delete_client(self.bus, self.addr)
    }
}

impl std::fmt::Debug for ClientGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientGuard")
            .field("bus", &self.bus)
            .field("addr", &self.addr)
            .field("kind", &self.kind)
            .field("armed", &self.armed)
            .finish()
    }
}

impl Drop for ClientGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        log::debug!("Deleting {} at i2c-{} 0x{:02x}", self.kind.driver(), self.bus, self.addr);
        if let Err(e) = self.factory.delete_client(self.bus, self.addr) {
            log::warn!("Could not delete client at i2c-{} 0x{:02x}: {}", self.bus, self.addr, e);
        }
    }
}

/// Everything a bootstrap learned and created.
#[derive(Debug)]
pub struct PlatformContext<'f> {
    adapters: HashMap<&'static str, u32>,
    virtual_buses: HashMap<u32, u32>,
    guards: Vec<ClientGuard<'f>>,
}

impl<'f> PlatformContext<'f> {
    pub fn new() -> Self {
        PlatformContext {
            adapters: HashMap::new(),
            virtual_buses: HashMap::new(),
            guards: Vec::new(),
        }
    }

    pub fn adapter_bus(&self, name: &str) -> Option<u32> {
        self.adapters.get(name).copied()
    }

    pub fn resolve(&self, bus: BusRef) -> Result<u32> {
        match bus {
            BusRef::Fixed(n) => Ok(n),
            BusRef::Adapter(name) => self
                .adapter_bus(name)
                .ok_or_else(|| Error::not_found(format!("adapter '{}' not resolved", name))),
            BusRef::Virtual(v) => self
                .virtual_buses
                .get(&v)
                .copied()
                .ok_or_else(|| Error::not_found(format!("virtual bus {} has no mux channel", v))),
        }
    }

    /// Live clients, oldest first.
    pub fn clients(&self) -> &[ClientGuard<'f>] {
        &self.guards
    }

    /// `(name, bus, addr)` of every CPLD client.
    pub fn cplds(&self) -> Vec<(&'static str, u32, u16)> {
        self.guards
            .iter()
            .filter_map(|g| match g.kind {
                DeviceKind::Cpld(c) => Some((c.name, g.bus, g.addr)),
                _ => None,
            })
            .collect()
    }

    /// The first client whose EEPROM carries `label`.
    pub fn find_label(&self, label: &str) -> Option<&ClientGuard<'f>> {
        self.guards.iter().find(|g| g.kind.label() == Some(label))
    }

    pub fn push(&mut self, guard: ClientGuard<'f>) {
        self.guards.push(guard);
    }

    /// Delete one client ahead of the rest.
    pub fn release(&mut self, bus: u32, addr: u16) -> Result<()> {
        let idx = self
            .guards
            .iter()
            .position(|g| g.bus == bus && g.addr == addr)
            .ok_or_else(|| Error::not_found(format!("no client at i2c-{} 0x{:02x}", bus, addr)))?;

        self.guards.remove(idx).release()
    }

    /// Leave every client in place when the context goes away.
    pub fn detach(mut self) -> Vec<(u32, u16, DeviceKind)> {
        self.guards
            .iter_mut()
            .map(|g| {
                g.armed = false;
                (g.bus, g.addr, g.kind)
            })
            .collect()
    }

    fn map_channels(&mut self, mux: &MuxConfig, channels: &[u32]) -> Result<()> {
        for (i, &real) in channels.iter().enumerate() {
            let v = mux.first_virtual + i as u32;
            if let Some(prev) = self.virtual_buses.insert(v, real) {
                return Err(Error::invalid_argument(format!(
                    "virtual bus {} claimed twice (i2c-{} and i2c-{})", v, prev, real
                )));
            }
            log::trace!("virtual bus {} -> i2c-{}", v, real);
        }
        Ok(())
    }
}

impl Default for PlatformContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlatformContext<'_> {
    fn drop(&mut self) {
        if !self.guards.is_empty() {
            log::debug!("Releasing {} clients", self.guards.len());
        }
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

/// Instantiate `table` in order. On error every client created so far is
/// deleted, newest first, before the error is returned.
pub fn bootstrap<'f>(
    factory: &'f dyn ClientFactory,
    enumerator: &dyn AdapterEnumerator,
    clock: &dyn Clock,
    policy: &RetryPolicy,
    table: &[DeviceSpec],
) -> Result<PlatformContext<'f>> {
    let mut ctx = PlatformContext::new();

    log::info!("Bootstrapping {} devices", table.len());

    for dev in table {
        if let BusRef::Adapter(name) = dev.bus {
            if !ctx.adapters.contains_key(name) {
                let bus = find_adapter(enumerator, name, policy, clock).map_err(|e| {
                    log::error!("Could not find the '{}' adapter: {}", name, e);
                    e
                })?;
                ctx.adapters.insert(name, bus);
            }
        }

        let bus = ctx.resolve(dev.bus)?;
        wait_for_bus(enumerator, bus, policy, clock)?;

        let guard = ClientGuard::create(factory, bus, dev.addr, dev.kind).map_err(|e| {
            log::error!("Failed to add {} on bus {}: {}", dev.kind.driver(), bus, e);
            e
        })?;
        ctx.push(guard);

        if let DeviceKind::Mux(mux) = dev.kind {
            let count = mux.chip.channels();
            let what = format!("{} channels of {} at i2c-{} 0x{:02x}", count, mux.chip.driver(), bus, dev.addr);
            let channels = poll(policy, clock, &what, || {
                let found = factory.mux_channels(bus, dev.addr, count)?;
                Ok((found.len() >= count as usize).then_some(found))
            })?;
            ctx.map_channels(&mux, &channels[..count as usize])?;
            factory.set_mux_idle(bus, dev.addr, mux.deselect_on_exit)?;
        }
    }

    log::info!("Bootstrap complete, {} clients", ctx.guards.len());
    Ok(ctx)
}
