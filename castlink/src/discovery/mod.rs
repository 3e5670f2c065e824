//! Device discovery.
//!
//! Each probe emits zero or more [`Device`] events through a [`DeviceSink`],
//! in no particular order, until it is stopped. Sinks are invoked from the
//! probes' own background threads, never from the thread that called `start`.

mod coordinator;
pub mod multicast;
pub mod registration;

use std::sync::Arc;

use crate::error::Result;
use crate::model::Device;

pub use coordinator::DiscoveryCoordinator;
pub use multicast::MulticastDiscovery;
pub use registration::RegistrationDiscovery;

/// Callback receiving every device a probe finds
pub type DeviceSink = Arc<dyn Fn(Device) + Send + Sync>;

/// A background discovery mechanism.
///
/// `start` while running restarts the probe from a clean state. `stop` is a
/// no-op when idle and may be called from any thread.
pub trait DiscoveryProbe: Send + Sync {
    fn name(&self) -> &'static str;

    fn start(&self, sink: DeviceSink) -> Result<()>;

    fn stop(&self);
}
