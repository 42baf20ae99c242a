//! Concrete entities backed by the resource manager.

pub mod hard_drive;
pub mod vrdp_server;

pub use hard_drive::HardDrive;
pub use vrdp_server::VrdpServer;
