//! Static descriptions of the supported switches.

use crate::attr::Attribute;
use crate::error::Result;
use crate::topology::{self, AdapterEnumerator, ClientFactory, Clock, DeviceSpec, PlatformContext, RetryPolicy};

pub mod accton_as5835;
pub mod accton_as7726;
pub mod accton_wedge100;

/// An attribute group a board's CPLD exposes.
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    pub name: &'static str,
    /// Driver name of the client the group belongs to.
    pub device: &'static str,
    pub attributes: fn() -> Result<Vec<Attribute>>,
}

#[derive(Debug, Clone, Copy)]
pub struct Board {
    pub name: &'static str,
    pub devices: &'static [DeviceSpec],
    pub groups: &'static [GroupSpec],
    /// Runs once every device in the table exists.
    pub fixup: Option<fn(&mut PlatformContext<'_>) -> Result<()>>,
}

impl Board {
    pub fn group(&self, name: &str) -> Option<&'static GroupSpec> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Bring up every device on the board, then apply the board fixup.
    pub fn bootstrap<'f>(
        &self,
        factory: &'f dyn ClientFactory,
        enumerator: &dyn AdapterEnumerator,
        clock: &dyn Clock,
        policy: &RetryPolicy,
    ) -> Result<PlatformContext<'f>> {
        log::info!("Bringing up {}", self.name);
        let mut ctx = topology::bootstrap(factory, enumerator, clock, policy, self.devices)?;
        if let Some(fixup) = self.fixup {
            fixup(&mut ctx)?;
        }
        Ok(ctx)
    }
}

pub static BOARDS: &[Board] = &[
    accton_as5835::AS5835_54T,
    accton_as7726::AS7726_32X,
    accton_wedge100::WEDGE100_32X,
];

pub fn find(name: &str) -> Option<&'static Board> {
    BOARDS.iter().find(|b| b.name == name)
}
