mod device;
mod device_id;
mod outcome;
mod playback_action;
mod protocol;

pub use device::{Device, DEFAULT_MULTICAST_NAME, DEFAULT_REGISTRATION_NAME};
pub use device_id::DeviceId;
pub use outcome::CommandOutcome;
pub use playback_action::PlaybackAction;
pub use protocol::Protocol;
