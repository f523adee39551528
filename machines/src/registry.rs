//! Machine registry for front-end discovery.
//!
//! Each front-end-capable machine self-registers via [`inventory::submit!`]
//! with a [`MachineEntry`] carrying its name and a factory function, so a
//! front end discovers available boards at runtime without a central list.

use altaid_core::core::machine::Machine;

use crate::rom_loader::{RomImage, RomLoadError};

/// Describes a front-end-capable machine.
pub struct MachineEntry {
    /// Name used to select this machine (e.g., "altaid").
    pub name: &'static str,
    /// Factory: construct a machine from a loaded ROM image.
    pub create: fn(&RomImage) -> Result<Box<dyn Machine>, RomLoadError>,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        create: fn(&RomImage) -> Result<Box<dyn Machine>, RomLoadError>,
    ) -> Self {
        Self { name, create }
    }
}

inventory::collect!(MachineEntry);

/// Return all registered machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a machine by name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}
