//! Find media receivers on the local network and tell them what to play.
//!
//! Receivers are found two ways: DNS-SD registrations of a custom service
//! type, and SSDP searches for UPnP media renderers. Either kind of
//! [`Device`] can then be driven through the [`Dispatcher`].
//!
//! ```no_run
//! use std::time::Duration;
//! use castlink::{CastConfig, DiscoveryCoordinator, Dispatcher, PlaybackAction};
//!
//! let config = CastConfig::default();
//! let devices = DiscoveryCoordinator::new(&config.discovery)?.discover_for(Duration::from_secs(6))?;
//! let dispatcher = Dispatcher::new(&config)?;
//! for device in &devices {
//!     let (ok, message): (bool, String) = dispatcher.control(device, PlaybackAction::Pause).into();
//!     println!("{}: {} {}", device.name(), ok, message);
//! }
//! # Ok::<(), castlink::CastError>(())
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod model;
pub mod sender;
pub mod transport;

pub use config::{CastConfig, ClientConfig, DiscoveryConfig};
pub use discovery::{
    DeviceSink, DiscoveryCoordinator, DiscoveryProbe, MulticastDiscovery, RegistrationDiscovery,
};
pub use error::{CastError, Result};
pub use model::{CommandOutcome, Device, DeviceId, PlaybackAction, Protocol};
pub use sender::{CastProtocol, Dispatcher, RegistrationClient, UpnpClient};
