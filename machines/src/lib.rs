pub mod altaid;
pub mod altaid_hw;
pub mod config;
pub mod panel;
pub mod registry;
pub mod rom_loader;
pub mod stateio;

pub use altaid::AltaidSystem;
pub use config::MachineConfig;
pub use rom_loader::RomImage;
