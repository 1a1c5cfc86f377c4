//! lifx-lan - LAN controller for LIFX devices
//!
//! This library discovers LIFX devices reachable by UDP broadcast,
//! maintains a long-lived session per device that keeps a cached model
//! of its state in sync, and exposes a query/command API along with
//! composite operations: color primitives, multizone and matrix frame
//! writing, and matrix animation effects.
//!
//! # Example
//!
//! ```no_run
//! use lifx_lan::{messages, Controller, Options};
//!
//! # fn main() -> lifx_lan::Result<()> {
//! let mut controller = Controller::new(Options::new())?;
//!
//! // Give discovery a moment, then list what answered.
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! for device in controller.get_devices() {
//!     println!("{} {} ({})", device.serial, device.label, device.light_type);
//!     controller.send(device.serial, messages::set_power_on())?;
//! }
//!
//! controller.close();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod matrix;
pub mod messages;
pub mod protocol;
pub mod registry;

pub use config::Config;
pub use controller::{Controller, DeviceSession, Options};
pub use device::{Color, Device, Serial};
pub use error::{Error, Result};
